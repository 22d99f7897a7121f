//! Predictive Insight
//!
//! Scores the viewer's most recent proposal with the success model. When
//! the viewer has no open proposal, a synthetic "typical next proposal" is
//! built from their history instead. Negative factors in the breakdown turn
//! into recommendations, best impact per effort first.

use std::collections::BTreeMap;

use crate::models::{Proposal, ProposalStatus, UserContext};
use crate::scoring::{description_quality, CalculationFactors, FactorKind, SuccessModel};

use super::engine::{AnalysisContext, InsightGenerator};
use super::types::{Insight, InsightPayload, InsightType, PredictiveData, Priority, Recommendation};

/// Insight that estimates a proposal's chance of funding
pub struct PredictiveGenerator {
    model: SuccessModel,
}

/// Proposal to score, and whether it was synthesized from history
struct Target {
    proposal: Proposal,
    synthetic: bool,
}

impl PredictiveGenerator {
    pub fn new(model: SuccessModel) -> Self {
        Self { model }
    }

    fn target(user: &UserContext, ctx: &AnalysisContext<'_>) -> Option<Target> {
        if let Some(proposal) = &user.last_proposal {
            return Some(Target {
                proposal: proposal.clone(),
                synthetic: false,
            });
        }
        if user.history.is_empty() {
            return None;
        }

        // Most frequent category; ties go to the alphabetically first
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for p in &user.history {
            *counts.entry(p.category.as_str()).or_default() += 1;
        }
        let mut category = "";
        let mut best = 0;
        for (name, count) in counts {
            if count > best {
                category = name;
                best = count;
            }
        }
        let amount =
            user.history.iter().map(|p| p.amount).sum::<f64>() / user.history.len() as f64;

        Some(Target {
            proposal: Proposal {
                id: "synthetic".to_string(),
                title: format!("Typical {} proposal", category),
                description: None,
                category: category.to_string(),
                amount,
                status: ProposalStatus::Draft,
                created_at: ctx.as_of,
                approved_at: None,
                executed_at: None,
                yes_votes: 0,
                no_votes: 0,
                participation_rate: 0.0,
            },
            synthetic: true,
        })
    }

    /// Derive model inputs for `target` from the context
    fn factors(
        target: &Proposal,
        user: &UserContext,
        ctx: &AnalysisContext<'_>,
    ) -> CalculationFactors {
        let peers = ctx
            .proposals
            .iter()
            .filter(|p| p.id != target.id && p.category.eq_ignore_ascii_case(&target.category));

        let (approved, decided) = peers.clone().fold((0usize, 0usize), |(a, d), p| {
            (
                a + p.status.is_approved() as usize,
                d + p.status.is_decided() as usize,
            )
        });
        let category_success_rate =
            (decided > 0).then(|| approved as f64 / decided as f64 * 100.0);

        let competing = peers
            .filter(|p| p.status == ProposalStatus::Active)
            .count();

        let (own_approved, own_decided) = user
            .history
            .iter()
            .filter(|p| p.id != target.id)
            .fold((0usize, 0usize), |(a, d), p| {
                (
                    a + p.status.is_approved() as usize,
                    d + p.status.is_decided() as usize,
                )
            });
        let reputation =
            (own_decided > 0).then(|| own_approved as f64 / own_decided as f64 * 100.0);

        let timing_sentiment = ctx.buckets.iter().rev().find_map(|b| b.approval_rate);

        CalculationFactors {
            amount: Some(target.amount),
            category_success_rate,
            description_quality_score: target.description.as_deref().map(description_quality),
            reputation,
            timing_sentiment,
            competition_level: Some((competing as f64 * 10.0).min(100.0)),
        }
    }

    fn recommendations(
        &self,
        insight_id: &str,
        target: &Proposal,
        factors: &CalculationFactors,
        negatives: &[FactorKind],
    ) -> Vec<Recommendation> {
        let lifts = self.model.factor_lifts(factors);
        let mut recommendations: Vec<Recommendation> = negatives
            .iter()
            .map(|&factor| {
                let impact = lifts
                    .iter()
                    .find(|l| l.factor == factor)
                    .map(|l| l.lift)
                    .unwrap_or(0.0);
                let (title, description, effort, category) = mitigation(factor, target);
                Recommendation {
                    id: format!("{}-{}", insight_id, factor.as_str()),
                    title: title.to_string(),
                    description,
                    impact,
                    effort,
                    category: category.to_string(),
                }
            })
            .collect();

        // Stable sort keeps factor order for equal ratios
        recommendations.sort_by(|a, b| {
            b.value_ratio()
                .partial_cmp(&a.value_ratio())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recommendations
    }
}

/// (title, description, effort, category) for improving one factor
fn mitigation(factor: FactorKind, target: &Proposal) -> (&'static str, String, u8, &'static str) {
    match factor {
        FactorKind::Amount => (
            "Reduce the requested amount",
            format!(
                "{:.0} STX is above what typically passes. Split the work into milestones \
                 and request the first tranche only.",
                target.amount
            ),
            1,
            "budget",
        ),
        FactorKind::CategorySuccessRate => (
            "Reframe the category fit",
            format!(
                "Few {} proposals get funded. Tie the work to an outcome the approved ones share.",
                target.category
            ),
            3,
            "positioning",
        ),
        FactorKind::DescriptionQuality => (
            "Strengthen the description",
            "Add a budget breakdown, a timeline, concrete deliverables and who is doing the work."
                .to_string(),
            1,
            "content",
        ),
        FactorKind::Reputation => (
            "Build a track record",
            "Deliver a smaller proposal first, or co-submit with an established contributor."
                .to_string(),
            3,
            "reputation",
        ),
        FactorKind::TimingSentiment => (
            "Wait for a better window",
            "Recent approval rates are low. Submitting after the current cycle may help."
                .to_string(),
            2,
            "timing",
        ),
        FactorKind::CompetitionLevel => (
            "Avoid the crowded queue",
            format!(
                "Several {} proposals are already up for a vote. Coordinate with them or wait.",
                target.category
            ),
            2,
            "timing",
        ),
    }
}

impl InsightGenerator for PredictiveGenerator {
    fn id(&self) -> InsightType {
        InsightType::Predictive
    }

    fn name(&self) -> &'static str {
        "Predictive"
    }

    fn generate(&self, ctx: &AnalysisContext<'_>) -> Vec<Insight> {
        let Some(user) = ctx.user else {
            return vec![];
        };
        let Some(Target {
            proposal: target,
            synthetic,
        }) = Self::target(user, ctx)
        else {
            return vec![];
        };

        let factors = Self::factors(&target, user, ctx);
        let result = self.model.score(&factors);
        let negatives: Vec<FactorKind> = result.negative_factors().map(|c| c.factor).collect();

        let point = result.point_estimate;
        let priority = if point < 40.0 {
            Priority::High
        } else if point < 60.0 {
            Priority::Medium
        } else {
            Priority::Low
        };
        let key = if synthetic {
            format!("synthetic:{}", target.category)
        } else {
            format!("proposal:{}", target.id)
        };
        let (low, high) = result.confidence_interval;
        let title = format!("{:.0}% chance of funding for \"{}\"", point, target.title);
        let description = if negatives.is_empty() {
            format!(
                "Estimated {:.0}% (likely {:.0}% to {:.0}%). No factor is holding it back.",
                point, low, high
            )
        } else {
            format!(
                "Estimated {:.0}% (likely {:.0}% to {:.0}%). {} of {} factors lower the estimate.",
                point,
                low,
                high,
                negatives.len(),
                result.breakdown.len()
            )
        };

        tracing::debug!(
            proposal = target.id.as_str(),
            synthetic,
            point_estimate = point,
            "Scored proposal"
        );

        let data = PredictiveData {
            proposal_id: (!synthetic).then(|| target.id.clone()),
            proposal_title: target.title.clone(),
            category: target.category.clone(),
            synthetic,
            result,
        };
        let insight = Insight::new(
            InsightPayload::Predictive(data),
            &key,
            priority,
            ctx.as_of,
            title,
            description,
        );
        let recommendations = self.recommendations(&insight.id, &target, &factors, &negatives);

        vec![insight.with_recommendations(recommendations)]
    }
}
