//! Insight engine - runs the generators and merges their findings

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::feed::merge_insights;
use crate::models::{Proposal, UserContext};
use crate::scoring::SuccessModel;
use crate::timeseries::{aggregate, Period, TimeBucket};

use super::types::{Insight, InsightType};
use super::{AnomalyGenerator, ComparativeGenerator, PredictiveGenerator, TrendGenerator};

/// Inputs shared by every generator for one run
pub struct AnalysisContext<'a> {
    /// Validated proposals the buckets were built from
    pub proposals: &'a [Proposal],
    /// Ascending, contiguous buckets
    pub buckets: &'a [TimeBucket],
    pub period: Period,
    /// Viewer context, if the request has one
    pub user: Option<&'a UserContext>,
    /// Timestamp for findings that are not tied to a single bucket
    pub as_of: DateTime<Utc>,
}

impl<'a> AnalysisContext<'a> {
    /// `as_of` defaults to the newest proposal, so reruns over the same data
    /// produce identical timestamps
    pub fn new(proposals: &'a [Proposal], buckets: &'a [TimeBucket], period: Period) -> Self {
        let as_of = proposals
            .iter()
            .map(|p| p.created_at)
            .max()
            .or_else(|| buckets.last().map(|b| b.period_end))
            .unwrap_or_default();
        Self {
            proposals,
            buckets,
            period,
            user: None,
            as_of,
        }
    }

    pub fn with_user(mut self, user: &'a UserContext) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = as_of;
        self
    }
}

/// A stateless insight generator
pub trait InsightGenerator: Send + Sync {
    /// Which insight type this generator emits
    fn id(&self) -> InsightType;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Derive findings from the context. Must not depend on anything else.
    fn generate(&self, ctx: &AnalysisContext<'_>) -> Vec<Insight>;
}

/// Runs every registered generator over a context
pub struct InsightEngine {
    config: EngineConfig,
    generators: Vec<Box<dyn InsightGenerator>>,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl InsightEngine {
    /// Create an engine with the four built-in generators
    pub fn new(config: EngineConfig) -> Self {
        let mut engine = Self::empty(config);

        engine.register(Box::new(TrendGenerator::new(engine.config.trend.clone())));
        engine.register(Box::new(AnomalyGenerator::new(
            engine.config.anomaly.clone(),
        )));
        engine.register(Box::new(ComparativeGenerator::new(
            engine.config.comparative.clone(),
        )));
        engine.register(Box::new(PredictiveGenerator::new(SuccessModel::new(
            engine.config.model.clone(),
        ))));

        engine
    }

    /// Create an engine with no generators registered
    pub fn empty(config: EngineConfig) -> Self {
        Self {
            config,
            generators: vec![],
        }
    }

    /// Register a generator
    pub fn register(&mut self, generator: Box<dyn InsightGenerator>) {
        self.generators.push(generator);
    }

    /// Run every generator and merge the findings
    ///
    /// Duplicate ids keep the first occurrence. The result is sorted by
    /// priority (highest first), then timestamp (most recent first).
    pub fn generate(&self, ctx: &AnalysisContext<'_>) -> Vec<Insight> {
        let batches: Vec<Vec<Insight>> = self
            .generators
            .iter()
            .map(|generator| {
                let findings = generator.generate(ctx);
                tracing::debug!(
                    generator = generator.id().as_str(),
                    count = findings.len(),
                    "Insight generation complete"
                );
                findings
            })
            .collect();

        let mut insights = merge_insights(batches);
        insights.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        insights
    }

    /// Aggregate, then generate: the full pipeline over raw proposals
    pub fn run(
        &self,
        proposals: &[Proposal],
        user: Option<&UserContext>,
    ) -> Result<Vec<Insight>> {
        let buckets = aggregate(proposals, self.config.period)?;
        let mut ctx = AnalysisContext::new(proposals, &buckets, self.config.period);
        if let Some(user) = user {
            ctx = ctx.with_user(user);
        }

        let insights = self.generate(&ctx);
        tracing::info!(
            proposals = proposals.len(),
            buckets = buckets.len(),
            insights = insights.len(),
            "Insight run complete"
        );
        Ok(insights)
    }

    /// Get list of registered insight types
    pub fn insight_types(&self) -> Vec<InsightType> {
        self.generators.iter().map(|g| g.id()).collect()
    }
}
