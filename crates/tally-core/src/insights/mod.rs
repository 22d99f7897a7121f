//! Insight generation
//!
//! Four stateless generators derive findings from a shared
//! [`AnalysisContext`]:
//! - trend: the latest bucket against its trailing average
//! - anomaly: buckets far from the series mean
//! - comparative: categories and funding tiers diverging from their peers
//! - predictive: success probability for the viewer's next proposal
//!
//! [`InsightEngine`] runs them and merges the results.

pub mod anomaly;
pub mod comparative;
pub mod engine;
pub mod predictive;
pub mod trend;
pub mod types;

pub use anomaly::AnomalyGenerator;
pub use comparative::{amount_tier, ComparativeGenerator};
pub use engine::{AnalysisContext, InsightEngine, InsightGenerator};
pub use predictive::PredictiveGenerator;
pub use trend::TrendGenerator;
pub use types::{
    insight_id, percent_change, AnomalyData, ComparativeData, ComparisonMetric, Dimension,
    Direction, Insight, InsightPayload, InsightType, PredictiveData, Priority, Recommendation,
    TrendData,
};

/// Upper-case the first character, for labels used at the start of a title
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("proposal volume"), "Proposal volume");
        assert_eq!(capitalize(""), "");
    }
}
