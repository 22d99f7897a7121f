//! Trend Insight
//!
//! Compares the most recent bucket with the trailing average of the buckets
//! before it. Each tracked metric that moved past the threshold becomes its
//! own insight, so each can be dismissed independently.

use crate::config::TrendConfig;
use crate::timeseries::{Metric, TimeBucket};

use super::capitalize;
use super::engine::{AnalysisContext, InsightGenerator};
use super::types::{
    percent_change, Insight, InsightPayload, InsightType, Priority, Recommendation, TrendData,
};

/// Insight that reports period-over-baseline changes
pub struct TrendGenerator {
    config: TrendConfig,
}

impl TrendGenerator {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    fn analyze_metric(
        &self,
        metric: Metric,
        current: &TimeBucket,
        prior: &[TimeBucket],
        ctx: &AnalysisContext<'_>,
    ) -> Option<Insight> {
        let value = current.metric(metric)?;
        let history: Vec<f64> = prior.iter().filter_map(|b| b.metric(metric)).collect();
        if history.len() < self.config.min_history {
            return None;
        }

        let baseline = history.iter().sum::<f64>() / history.len() as f64;
        let change = percent_change(value, baseline)?;
        if change.abs() <= self.config.threshold_percent {
            return None;
        }

        let priority = Priority::from_magnitude(
            change.abs(),
            self.config.high_percent,
            self.config.medium_percent,
        );
        let direction = if change > 0.0 { "up" } else { "down" };
        let period_label = ctx.period.label(current.period_start);

        let data = TrendData {
            metric,
            period_start: current.period_start,
            current: value,
            baseline,
            percent_change: change,
            window: history.len(),
        };
        let key = format!("{}:{}", metric.as_str(), current.period_start.to_rfc3339());

        let insight = Insight::new(
            InsightPayload::Trend(data),
            &key,
            priority,
            current.period_start,
            format!(
                "{} {} {:.0}%",
                capitalize(metric.label()),
                direction,
                change.abs()
            ),
            format!(
                "{} in the {} against a {}-period average of {}.",
                metric.format_value(value),
                period_label,
                history.len(),
                metric.format_value(baseline)
            ),
        );

        let recommendations = if metric == Metric::ApprovalRate && change < 0.0 {
            vec![Recommendation {
                id: format!("{}-review", insight.id),
                title: "Review recent rejections".to_string(),
                description: format!(
                    "Approvals fell to {} in the {}. Read the objections raised on rejected \
                     proposals before submitting a similar one.",
                    metric.format_value(value),
                    period_label
                ),
                impact: ((baseline - value) / 2.0).max(0.0),
                effort: 1,
                category: "research".to_string(),
            }]
        } else {
            vec![]
        };

        Some(insight.with_recommendations(recommendations))
    }
}

impl InsightGenerator for TrendGenerator {
    fn id(&self) -> InsightType {
        InsightType::Trend
    }

    fn name(&self) -> &'static str {
        "Trend"
    }

    fn generate(&self, ctx: &AnalysisContext<'_>) -> Vec<Insight> {
        let Some((current, earlier)) = ctx.buckets.split_last() else {
            return vec![];
        };
        let start = earlier.len().saturating_sub(self.config.window);
        let prior = &earlier[start..];

        self.config
            .metrics
            .iter()
            .filter_map(|&metric| self.analyze_metric(metric, current, prior, ctx))
            .collect()
    }
}
