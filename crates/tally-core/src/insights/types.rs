//! Core types for the insight engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::scoring::ProbabilityResult;
use crate::timeseries::Metric;

/// Kinds of insight the generators produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Latest period vs the trailing average
    Trend,
    /// A period far outside the series' usual range
    Anomaly,
    /// A category or tier diverging from its peers
    Comparative,
    /// Success estimate for the viewer's next proposal
    Predictive,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::Trend => "trend",
            InsightType::Anomaly => "anomaly",
            InsightType::Comparative => "comparative",
            InsightType::Predictive => "predictive",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trend" => Ok(InsightType::Trend),
            "anomaly" => Ok(InsightType::Anomaly),
            "comparative" => Ok(InsightType::Comparative),
            "predictive" => Ok(InsightType::Predictive),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}

/// How prominently an insight should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Numeric rank for sorting (higher = more important)
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    /// Map a magnitude onto priority with strict `>` cut-offs
    pub fn from_magnitude(magnitude: f64, high: f64, medium: f64) -> Self {
        if magnitude > high {
            Priority::High
        } else if magnitude > medium {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// A suggested action attached to an insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Estimated lift in success probability, in percentage points
    pub impact: f64,
    /// 1 (easy) to 3 (hard)
    pub effort: u8,
    pub category: String,
}

impl Recommendation {
    /// Impact per unit of effort, used to order suggestions
    pub fn value_ratio(&self) -> f64 {
        self.impact / self.effort.clamp(1, 3) as f64
    }
}

/// Grouping used by the comparative generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    /// small (< 100 STX), medium (< 1000 STX), large
    AmountTier,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::AmountTier => "amount_tier",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::AmountTier => "funding tier",
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(Dimension::Category),
            "amount_tier" => Ok(Dimension::AmountTier),
            _ => Err(format!("Unknown dimension: {}", s)),
        }
    }
}

/// Metric compared across groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMetric {
    ApprovalRate,
    AverageFunding,
}

impl ComparisonMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonMetric::ApprovalRate => "approval_rate",
            ComparisonMetric::AverageFunding => "average_funding",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComparisonMetric::ApprovalRate => "approval rate",
            ComparisonMetric::AverageFunding => "average request",
        }
    }

    pub fn format_value(&self, value: f64) -> String {
        match self {
            ComparisonMetric::ApprovalRate => format!("{:.0}%", value),
            ComparisonMetric::AverageFunding => format!("{:.0} STX", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }
}

/// Data for trend insights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendData {
    pub metric: Metric,
    pub period_start: DateTime<Utc>,
    pub current: f64,
    /// Trailing average of the prior buckets
    pub baseline: f64,
    pub percent_change: f64,
    /// Number of prior buckets in the baseline
    pub window: usize,
}

/// Data for anomaly insights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyData {
    pub metric: Metric,
    pub period_start: DateTime<Utc>,
    pub value: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub z_score: f64,
    pub samples: usize,
}

/// Data for comparative insights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeData {
    pub dimension: Dimension,
    pub group: String,
    pub metric: ComparisonMetric,
    pub value: f64,
    /// Unweighted mean across all compared groups
    pub cross_mean: f64,
    pub percent_diff: f64,
    pub direction: Direction,
    pub group_size: usize,
}

/// Data for predictive insights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveData {
    /// Id of the scored proposal; `None` for a synthetic one
    pub proposal_id: Option<String>,
    pub proposal_title: String,
    pub category: String,
    /// Built from history averages rather than a real proposal
    pub synthetic: bool,
    pub result: ProbabilityResult,
}

/// Generator-specific payload, tagged by insight type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InsightPayload {
    Trend(TrendData),
    Anomaly(AnomalyData),
    Comparative(ComparativeData),
    Predictive(PredictiveData),
}

impl InsightPayload {
    pub fn insight_type(&self) -> InsightType {
        match self {
            InsightPayload::Trend(_) => InsightType::Trend,
            InsightPayload::Anomaly(_) => InsightType::Anomaly,
            InsightPayload::Comparative(_) => InsightType::Comparative,
            InsightPayload::Predictive(_) => InsightType::Predictive,
        }
    }
}

/// A displayable finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Stable across runs for the same finding, see [`insight_id`]
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
    pub actionable: bool,
    pub recommendations: Vec<Recommendation>,
    #[serde(flatten)]
    pub payload: InsightPayload,
}

impl Insight {
    /// Create an insight whose id is derived from its type and `subject_key`
    pub fn new(
        payload: InsightPayload,
        subject_key: &str,
        priority: Priority,
        timestamp: DateTime<Utc>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: insight_id(payload.insight_type(), subject_key),
            title: title.into(),
            description: description.into(),
            priority,
            timestamp,
            actionable: false,
            recommendations: vec![],
            payload,
        }
    }

    pub fn insight_type(&self) -> InsightType {
        self.payload.insight_type()
    }

    /// Attach recommendations; a non-empty list makes the insight actionable
    pub fn with_recommendations(mut self, recommendations: Vec<Recommendation>) -> Self {
        self.actionable = self.actionable || !recommendations.is_empty();
        self.recommendations = recommendations;
        self
    }

    /// Case-insensitive substring match on title or description
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Deterministic id: `<type>-<first 16 hex chars of sha256(type:subject)>`
pub fn insight_id(insight_type: InsightType, subject_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(insight_type.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(subject_key.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}", insight_type.as_str(), &digest[..16])
}

/// Signed percent change from `baseline` to `current`; `None` when the
/// baseline is zero or either side is not finite
pub fn percent_change(current: f64, baseline: f64) -> Option<f64> {
    if !current.is_finite() || !baseline.is_finite() || baseline.abs() < f64::EPSILON {
        return None;
    }
    Some((current - baseline) / baseline.abs() * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::at;

    fn trend_payload() -> InsightPayload {
        InsightPayload::Trend(TrendData {
            metric: Metric::ProposalCount,
            period_start: at("2024-01-01"),
            current: 25.0,
            baseline: 10.0,
            percent_change: 150.0,
            window: 4,
        })
    }

    #[test]
    fn test_insight_type_round_trip() {
        assert_eq!(InsightType::Comparative.as_str(), "comparative");
        assert_eq!(
            InsightType::from_str("Predictive").unwrap(),
            InsightType::Predictive
        );
        assert!(InsightType::from_str("forecast").is_err());
    }

    #[test]
    fn test_priority_rank_and_cutoffs() {
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
        assert_eq!(Priority::from_magnitude(36.0, 35.0, 20.0), Priority::High);
        assert_eq!(Priority::from_magnitude(35.0, 35.0, 20.0), Priority::Medium);
        assert_eq!(Priority::from_magnitude(20.0, 35.0, 20.0), Priority::Low);
    }

    #[test]
    fn test_insight_id_is_stable_and_scoped_by_type() {
        let a = insight_id(InsightType::Trend, "proposal_count:2024-01-01");
        let b = insight_id(InsightType::Trend, "proposal_count:2024-01-01");
        let c = insight_id(InsightType::Anomaly, "proposal_count:2024-01-01");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("trend-"));
        assert_eq!(a.len(), "trend-".len() + 16);
    }

    #[test]
    fn test_insight_builder_and_search() {
        let rec = Recommendation {
            id: "r1".to_string(),
            title: "Do a thing".to_string(),
            description: "".to_string(),
            impact: 6.0,
            effort: 2,
            category: "proposal".to_string(),
        };
        let insight = Insight::new(
            trend_payload(),
            "proposal_count:2024-01-01",
            Priority::High,
            at("2024-01-01"),
            "Proposal volume up 150%",
            "25 proposals vs a 4-period average of 10",
        )
        .with_recommendations(vec![rec.clone()]);

        assert_eq!(insight.insight_type(), InsightType::Trend);
        assert!(insight.actionable);
        assert_eq!(rec.value_ratio(), 3.0);
        assert!(insight.matches_search("VOLUME"));
        assert!(insight.matches_search("average of 10"));
        assert!(!insight.matches_search("funding"));
    }

    #[test]
    fn test_insight_serializes_with_type_tag() {
        let insight = Insight::new(
            trend_payload(),
            "k",
            Priority::Low,
            at("2024-01-01"),
            "t",
            "d",
        );
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["type"], "trend");
        assert_eq!(json["priority"], "low");
        assert_eq!(json["data"]["metric"], "proposal_count");
        assert_eq!(json["id"], insight.id.as_str());
    }

    #[test]
    fn test_percent_change_guards_zero_baseline() {
        assert_eq!(percent_change(15.0, 10.0), Some(50.0));
        assert_eq!(percent_change(5.0, 0.0), None);
        assert_eq!(percent_change(f64::NAN, 10.0), None);
    }
}
