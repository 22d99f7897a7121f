//! Anomaly Insight
//!
//! Flags buckets whose metric sits more than `sigma` standard deviations
//! from the series mean. Buckets where a metric has no value (approval rate
//! of an empty bucket) are left out; zero counts and funding are observations.

use crate::config::AnomalyConfig;
use crate::timeseries::{Metric, TimeBucket};

use super::engine::{AnalysisContext, InsightGenerator};
use super::types::{AnomalyData, Insight, InsightPayload, InsightType, Priority};

/// Insight that flags statistical outliers among buckets
pub struct AnomalyGenerator {
    config: AnomalyConfig,
}

impl AnomalyGenerator {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    fn analyze_metric(&self, metric: Metric, ctx: &AnalysisContext<'_>) -> Vec<Insight> {
        let samples: Vec<(&TimeBucket, f64)> = ctx
            .buckets
            .iter()
            .filter_map(|b| b.metric(metric).map(|v| (b, v)))
            .collect();

        if samples.len() < self.config.min_samples.max(3) {
            tracing::debug!(
                metric = metric.as_str(),
                samples = samples.len(),
                "Too few buckets for anomaly detection"
            );
            return vec![];
        }

        let n = samples.len() as f64;
        let mean = samples.iter().map(|(_, v)| v).sum::<f64>() / n;
        let variance = samples.iter().map(|(_, v)| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        if !std_dev.is_finite() || std_dev < 1e-9 {
            return vec![];
        }

        samples
            .iter()
            .filter_map(|&(bucket, value)| {
                let z_score = (value - mean) / std_dev;
                if z_score.abs() <= self.config.sigma {
                    return None;
                }

                let priority = Priority::from_magnitude(
                    z_score.abs(),
                    self.config.sigma + 1.0,
                    self.config.sigma + 0.5,
                );
                let direction = if z_score > 0.0 { "above" } else { "below" };
                let period_label = ctx.period.label(bucket.period_start);
                let key = format!("{}:{}", metric.as_str(), bucket.period_start.to_rfc3339());

                let data = AnomalyData {
                    metric,
                    period_start: bucket.period_start,
                    value,
                    mean,
                    std_dev,
                    z_score,
                    samples: samples.len(),
                };

                Some(Insight::new(
                    InsightPayload::Anomaly(data),
                    &key,
                    priority,
                    bucket.period_start,
                    format!("Unusual {} in the {}", metric.label(), period_label),
                    format!(
                        "{} is {:.1} standard deviations {} the {}-period mean of {}.",
                        metric.format_value(value),
                        z_score.abs(),
                        direction,
                        samples.len(),
                        metric.format_value(mean)
                    ),
                ))
            })
            .collect()
    }
}

impl InsightGenerator for AnomalyGenerator {
    fn id(&self) -> InsightType {
        InsightType::Anomaly
    }

    fn name(&self) -> &'static str {
        "Anomaly"
    }

    fn generate(&self, ctx: &AnalysisContext<'_>) -> Vec<Insight> {
        self.config
            .metrics
            .iter()
            .flat_map(|&metric| self.analyze_metric(metric, ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{at, bucket_series};
    use crate::timeseries::Period;

    fn run(rows: &[(u32, f64, u32)]) -> Vec<Insight> {
        let buckets = bucket_series("2024-01-01", Period::Week, rows);
        let ctx = AnalysisContext::new(&[], &buckets, Period::Week);
        AnomalyGenerator::new(AnomalyConfig::default()).generate(&ctx)
    }

    #[test]
    fn test_spike_is_flagged() {
        let mut rows = vec![(10, 500.0, 5); 7];
        rows.push((40, 500.0, 20));
        let insights = run(&rows);

        assert_eq!(insights.len(), 1);
        let insight = &insights[0];
        assert_eq!(insight.priority, Priority::Medium);
        assert!(insight.title.starts_with("Unusual proposal volume"));
        assert!(insight.description.contains("above"));
        match &insight.payload {
            InsightPayload::Anomaly(data) => {
                assert_eq!(data.samples, 8);
                assert!(data.z_score > 2.5 && data.z_score < 3.0);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_two_buckets_emit_nothing() {
        let insights = run(&[(5, 100.0, 1), (90, 9000.0, 90)]);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_approval_rate_skips_empty_buckets() {
        // Approval rate has only two values, the empty weeks are not zeros
        let buckets = bucket_series(
            "2024-01-01",
            Period::Week,
            &[(10, 100.0, 1), (0, 0.0, 0), (0, 0.0, 0), (10, 100.0, 10)],
        );
        let ctx = AnalysisContext::new(&[], &buckets, Period::Week);
        let config = AnomalyConfig {
            metrics: vec![Metric::ApprovalRate],
            ..AnomalyConfig::default()
        };
        assert!(AnomalyGenerator::new(config).generate(&ctx).is_empty());
    }

    #[test]
    fn test_zero_variance_emits_nothing() {
        let insights = run(&[(10, 100.0, 5); 6]);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_empty_week_in_steady_series_is_flagged() {
        let mut rows = vec![(10, 500.0, 5); 5];
        rows.push((0, 0.0, 0));
        rows.extend(vec![(10, 500.0, 5); 4]);
        let insights = run(&rows);

        // Proposal volume and requested funding both drop to zero
        assert_eq!(insights.len(), 2);
        let empty_week = at("2024-02-05");
        for insight in &insights {
            assert_eq!(insight.timestamp, empty_week);
            assert!(insight.description.contains("below"));
            match &insight.payload {
                InsightPayload::Anomaly(data) => {
                    assert_eq!(data.samples, 10);
                    assert!((data.z_score + 3.0).abs() < 1e-9);
                    assert_eq!(data.value, 0.0);
                }
                other => panic!("unexpected payload {:?}", other),
            }
        }
        assert!(insights
            .iter()
            .any(|i| i.title.starts_with("Unusual proposal volume")));
        assert!(insights
            .iter()
            .any(|i| i.title.starts_with("Unusual requested funding")));
    }

    #[test]
    fn test_drop_is_reported_below_mean() {
        let mut rows = vec![(10, 1000.0, 5); 10];
        rows.push((10, 10.0, 5));
        let insights = run(&rows);

        assert_eq!(insights.len(), 1);
        assert!(insights[0].title.contains("requested funding"));
        assert!(insights[0].description.contains("below"));
        assert_eq!(insights[0].priority, Priority::High);
    }
}
