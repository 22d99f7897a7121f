//! Comparative Insight
//!
//! Cross-cuts the proposal set by a dimension (category or funding tier) and
//! reports groups whose approval rate or average request diverges from the
//! unweighted mean of all groups.

use std::collections::BTreeMap;

use crate::config::ComparativeConfig;
use crate::models::{Proposal, UserContext};

use super::engine::{AnalysisContext, InsightGenerator};
use super::types::{
    percent_change, ComparativeData, ComparisonMetric, Dimension, Direction, Insight,
    InsightPayload, InsightType, Priority, Recommendation,
};

/// Funding tier of a requested amount: small (< 100 STX), medium (< 1000 STX), large
pub fn amount_tier(amount: f64) -> &'static str {
    if amount < 100.0 {
        "small"
    } else if amount < 1000.0 {
        "medium"
    } else {
        "large"
    }
}

/// Per-group statistics
struct GroupStats {
    size: usize,
    approved: usize,
    decided: usize,
    total_amount: f64,
}

impl GroupStats {
    fn metric(&self, metric: ComparisonMetric) -> Option<f64> {
        match metric {
            ComparisonMetric::ApprovalRate if self.decided > 0 => {
                Some(self.approved as f64 / self.decided as f64 * 100.0)
            }
            ComparisonMetric::ApprovalRate => None,
            ComparisonMetric::AverageFunding if self.size > 0 => {
                Some(self.total_amount / self.size as f64)
            }
            ComparisonMetric::AverageFunding => None,
        }
    }
}

/// Insight that reports groups diverging from their peers
pub struct ComparativeGenerator {
    config: ComparativeConfig,
}

impl ComparativeGenerator {
    pub fn new(config: ComparativeConfig) -> Self {
        Self { config }
    }

    fn group_key(dimension: Dimension, proposal: &Proposal) -> String {
        match dimension {
            Dimension::Category => proposal.category.clone(),
            Dimension::AmountTier => amount_tier(proposal.amount).to_string(),
        }
    }

    fn group(&self, dimension: Dimension, proposals: &[Proposal]) -> BTreeMap<String, GroupStats> {
        let mut groups: BTreeMap<String, GroupStats> = BTreeMap::new();
        for proposal in proposals {
            let stats = groups
                .entry(Self::group_key(dimension, proposal))
                .or_insert(GroupStats {
                    size: 0,
                    approved: 0,
                    decided: 0,
                    total_amount: 0.0,
                });
            stats.size += 1;
            stats.total_amount += proposal.amount;
            if proposal.status.is_decided() {
                stats.decided += 1;
            }
            if proposal.status.is_approved() {
                stats.approved += 1;
            }
        }
        groups.retain(|_, stats| stats.size >= self.config.min_group_size.max(1));
        groups
    }

    /// Whether a finding about this group concerns the viewer
    fn is_relevant(dimension: Dimension, group: &str, user: Option<&UserContext>) -> bool {
        let Some(user) = user else {
            return false;
        };
        match dimension {
            Dimension::Category => user.follows(group) || user.has_proposed_in(group),
            Dimension::AmountTier => user
                .last_proposal
                .as_ref()
                .map(|p| amount_tier(p.amount) == group)
                .unwrap_or(false),
        }
    }

    fn recommendation(
        insight_id: &str,
        data: &ComparativeData,
        dimension_label: &str,
    ) -> Option<Recommendation> {
        match (data.metric, data.direction) {
            (ComparisonMetric::ApprovalRate, Direction::Below) => Some(Recommendation {
                id: format!("{}-study", insight_id),
                title: format!("Study approved {} proposals", data.group),
                description: format!(
                    "Proposals in the {} {} pass at {} against {} overall. Model budgets \
                     and milestones on the ones that were funded.",
                    data.group,
                    dimension_label,
                    data.metric.format_value(data.value),
                    data.metric.format_value(data.cross_mean)
                ),
                impact: ((data.cross_mean - data.value) / 2.0).max(0.0),
                effort: 2,
                category: "research".to_string(),
            }),
            (ComparisonMetric::AverageFunding, Direction::Above) => Some(Recommendation {
                id: format!("{}-rightsize", insight_id),
                title: "Compare your budget with peers".to_string(),
                description: format!(
                    "Requests in the {} {} average {} against {} overall.",
                    data.group,
                    dimension_label,
                    data.metric.format_value(data.value),
                    data.metric.format_value(data.cross_mean)
                ),
                impact: (data.percent_diff.abs() / 10.0).min(10.0),
                effort: 1,
                category: "budget".to_string(),
            }),
            _ => None,
        }
    }

    fn analyze_dimension(&self, dimension: Dimension, ctx: &AnalysisContext<'_>) -> Vec<Insight> {
        let groups = self.group(dimension, ctx.proposals);
        if groups.len() < 2 {
            tracing::debug!(
                dimension = dimension.as_str(),
                groups = groups.len(),
                "Not enough groups to compare"
            );
            return vec![];
        }

        let mut insights = Vec::new();
        for metric in [ComparisonMetric::ApprovalRate, ComparisonMetric::AverageFunding] {
            let values: Vec<(&String, &GroupStats, f64)> = groups
                .iter()
                .filter_map(|(name, stats)| stats.metric(metric).map(|v| (name, stats, v)))
                .collect();
            if values.len() < 2 {
                continue;
            }
            let cross_mean = values.iter().map(|(_, _, v)| v).sum::<f64>() / values.len() as f64;

            for (group, stats, value) in values {
                let Some(diff) = percent_change(value, cross_mean) else {
                    continue;
                };
                if diff.abs() <= self.config.threshold_percent {
                    continue;
                }

                let direction = if diff > 0.0 {
                    Direction::Above
                } else {
                    Direction::Below
                };
                let data = ComparativeData {
                    dimension,
                    group: group.clone(),
                    metric,
                    value,
                    cross_mean,
                    percent_diff: diff,
                    direction,
                    group_size: stats.size,
                };
                let title = match (metric, direction) {
                    (ComparisonMetric::ApprovalRate, Direction::Below) => {
                        format!("{} underperforms on {}", group, metric.label())
                    }
                    (ComparisonMetric::ApprovalRate, Direction::Above) => {
                        format!("{} outperforms on {}", group, metric.label())
                    }
                    (ComparisonMetric::AverageFunding, Direction::Above) => {
                        format!("{} asks for more than its peers", group)
                    }
                    (ComparisonMetric::AverageFunding, Direction::Below) => {
                        format!("{} asks for less than its peers", group)
                    }
                };
                let description = format!(
                    "The {} {} has a {} of {}, {:.0}% {} the mean of {} across {} groups.",
                    group,
                    dimension.label(),
                    metric.label(),
                    metric.format_value(value),
                    diff.abs(),
                    direction.as_str(),
                    metric.format_value(cross_mean),
                    groups.len()
                );
                let key = format!(
                    "{}:{}:{}:{}",
                    dimension.as_str(),
                    group,
                    metric.as_str(),
                    direction.as_str()
                );
                let priority = Priority::from_magnitude(
                    diff.abs(),
                    self.config.high_percent,
                    self.config.medium_percent,
                );

                let mut insight = Insight::new(
                    InsightPayload::Comparative(data.clone()),
                    &key,
                    priority,
                    ctx.as_of,
                    title,
                    description,
                );
                if Self::is_relevant(dimension, group, ctx.user) {
                    let recommendations =
                        Self::recommendation(&insight.id, &data, dimension.label())
                            .into_iter()
                            .collect();
                    insight = insight.with_recommendations(recommendations);
                }
                insights.push(insight);
            }
        }
        insights
    }
}

impl InsightGenerator for ComparativeGenerator {
    fn id(&self) -> InsightType {
        InsightType::Comparative
    }

    fn name(&self) -> &'static str {
        "Comparative"
    }

    fn generate(&self, ctx: &AnalysisContext<'_>) -> Vec<Insight> {
        self.config
            .dimensions
            .iter()
            .flat_map(|&dimension| self.analyze_dimension(dimension, ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::test_utils::category_batch;
    use crate::timeseries::Period;

    fn two_categories() -> Vec<Proposal> {
        let mut proposals = category_batch("a", "A", 10, 9, 100.0, "2024-01-03");
        proposals.extend(category_batch("b", "B", 10, 4, 100.0, "2024-01-04"));
        proposals
    }

    #[test]
    fn test_amount_tiers() {
        assert_eq!(amount_tier(0.0), "small");
        assert_eq!(amount_tier(99.9), "small");
        assert_eq!(amount_tier(100.0), "medium");
        assert_eq!(amount_tier(1000.0), "large");
    }

    #[test]
    fn test_underperforming_category_is_named() {
        let proposals = two_categories();
        let ctx = AnalysisContext::new(&proposals, &[], Period::Week);
        let insights = ComparativeGenerator::new(ComparativeConfig::default()).generate(&ctx);

        let below = insights
            .iter()
            .find(|i| i.title == "B underperforms on approval rate")
            .expect("B should be reported");
        match &below.payload {
            InsightPayload::Comparative(data) => {
                assert_eq!(data.direction, Direction::Below);
                assert_eq!(data.value, 40.0);
                assert_eq!(data.cross_mean, 65.0);
                assert_eq!(data.group_size, 10);
            }
            other => panic!("unexpected payload {:?}", other),
        }
        // No viewer, so nothing is actionable
        assert!(!below.actionable);

        // Equal amounts, single tier: no funding or tier findings
        assert!(insights
            .iter()
            .all(|i| i.title.contains("approval rate")));
    }

    #[test]
    fn test_single_category_emits_nothing() {
        let proposals = category_batch("a", "A", 10, 2, 100.0, "2024-01-03");
        let ctx = AnalysisContext::new(&proposals, &[], Period::Week);
        let insights = ComparativeGenerator::new(ComparativeConfig::default()).generate(&ctx);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_followed_category_gets_recommendation() {
        let proposals = two_categories();
        let user = UserContext::new(Role::Voter).with_preferences(vec!["b".to_string()]);
        let ctx = AnalysisContext::new(&proposals, &[], Period::Week).with_user(&user);
        let insights = ComparativeGenerator::new(ComparativeConfig::default()).generate(&ctx);

        let below = insights
            .iter()
            .find(|i| i.title.starts_with("B underperforms"))
            .unwrap();
        assert!(below.actionable);
        assert_eq!(below.recommendations.len(), 1);
        assert_eq!(below.recommendations[0].impact, 12.5);
    }

    #[test]
    fn test_funding_tiers_compared() {
        let mut proposals = category_batch("s", "grants", 4, 4, 50.0, "2024-01-03");
        proposals.extend(category_batch("l", "grants", 4, 0, 5000.0, "2024-01-03"));
        let config = ComparativeConfig {
            dimensions: vec![Dimension::AmountTier],
            ..ComparativeConfig::default()
        };
        let ctx = AnalysisContext::new(&proposals, &[], Period::Week);
        let insights = ComparativeGenerator::new(config).generate(&ctx);

        assert!(insights
            .iter()
            .any(|i| i.title == "large underperforms on approval rate"));
        assert!(insights
            .iter()
            .any(|i| i.title == "large asks for more than its peers"));
    }

    #[test]
    fn test_min_group_size_filters_small_groups() {
        let mut proposals = category_batch("a", "A", 10, 9, 100.0, "2024-01-03");
        proposals.extend(category_batch("b", "B", 2, 0, 100.0, "2024-01-04"));
        let config = ComparativeConfig {
            min_group_size: 5,
            ..ComparativeConfig::default()
        };
        let ctx = AnalysisContext::new(&proposals, &[], Period::Week);
        assert!(ComparativeGenerator::new(config).generate(&ctx).is_empty());
    }
}
