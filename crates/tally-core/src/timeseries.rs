//! Time-series aggregation of proposals into period buckets
//!
//! Buckets are half-open `[period_start, period_end)` intervals aligned to
//! calendar boundaries in UTC. Every period between the earliest and latest
//! proposal gets a bucket, including empty ones, and buckets are always
//! returned in ascending order with `b[i-1].period_end == b[i].period_start`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::models::Proposal;

/// Bucket width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Monday 00:00 UTC to the following Monday
    #[default]
    Week,
    /// First of the month to the first of the next month
    Month,
    /// Calendar quarter starting Jan/Apr/Jul/Oct
    Quarter,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
        }
    }

    /// Start of the period containing `ts`
    pub fn align(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = ts.date_naive();
        let start = match self {
            Self::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            Self::Month => first_of_month(date.year(), date.month()),
            Self::Quarter => first_of_month(date.year(), ((date.month() - 1) / 3) * 3 + 1),
        };
        midnight(start)
    }

    /// Start of the period following the one that starts at `start`
    pub fn advance(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        let date = start.date_naive();
        let next = match self {
            Self::Week => date + Duration::days(7),
            Self::Month => add_months(date, 1),
            Self::Quarter => add_months(date, 3),
        };
        midnight(next)
    }

    /// Human label for a period starting at `start` ("week of 2024-03-04", "2024-03", "2024-Q1")
    pub fn label(&self, start: DateTime<Utc>) -> String {
        match self {
            Self::Week => format!("week of {}", start.format("%Y-%m-%d")),
            Self::Month => start.format("%Y-%m").to_string(),
            Self::Quarter => format!("{}-Q{}", start.year(), (start.month() - 1) / 3 + 1),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            "quarter" | "quarterly" => Ok(Self::Quarter),
            _ => Err(format!("Unknown period: {}", s)),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("Day 1 always valid")
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.month0() + months;
    first_of_month(date.year() + (zero_based / 12) as i32, zero_based % 12 + 1)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// A bucket metric that generators can track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ProposalCount,
    TotalFunding,
    ApprovalRate,
    AverageParticipation,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposalCount => "proposal_count",
            Self::TotalFunding => "total_funding",
            Self::ApprovalRate => "approval_rate",
            Self::AverageParticipation => "average_participation",
        }
    }

    /// Lowercase noun phrase used in insight text
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProposalCount => "proposal volume",
            Self::TotalFunding => "requested funding",
            Self::ApprovalRate => "approval rate",
            Self::AverageParticipation => "voter participation",
        }
    }

    /// Render a value of this metric for display
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Self::ProposalCount => format!("{:.0} proposals", value),
            Self::TotalFunding => format!("{:.0} STX", value),
            Self::ApprovalRate | Self::AverageParticipation => format!("{:.1}%", value),
        }
    }

    /// The default tracked set for trend and anomaly generators
    pub fn defaults() -> &'static [Metric] {
        &[Self::ProposalCount, Self::TotalFunding, Self::ApprovalRate]
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "proposal_count" => Ok(Self::ProposalCount),
            "total_funding" => Ok(Self::TotalFunding),
            "approval_rate" => Ok(Self::ApprovalRate),
            "average_participation" => Ok(Self::AverageParticipation),
            _ => Err(format!("Unknown metric: {}", s)),
        }
    }
}

/// Aggregated metrics for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub proposal_count: u32,
    pub total_funding: f64,
    pub approved_count: u32,
    pub rejected_count: u32,
    /// Approved share of all proposals in the bucket (0-100); `None` when empty
    pub approval_rate: Option<f64>,
    pub yes_votes: u64,
    pub no_votes: u64,
    /// Mean participation rate; `None` when empty
    pub average_participation: Option<f64>,
}

impl TimeBucket {
    fn empty(period_start: DateTime<Utc>, period_end: DateTime<Utc>) -> Self {
        Self {
            period_start,
            period_end,
            proposal_count: 0,
            total_funding: 0.0,
            approved_count: 0,
            rejected_count: 0,
            approval_rate: None,
            yes_votes: 0,
            no_votes: 0,
            average_participation: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.proposal_count == 0
    }

    /// Value of a metric for this bucket. Rates are `None` for empty buckets.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::ProposalCount => Some(self.proposal_count as f64),
            Metric::TotalFunding => Some(self.total_funding),
            Metric::ApprovalRate => self.approval_rate,
            Metric::AverageParticipation => self.average_participation,
        }
    }
}

/// Group proposals into contiguous buckets of `period`
///
/// Every proposal is validated first; one malformed record fails the whole
/// call. An empty input yields an empty bucket list.
pub fn aggregate(proposals: &[Proposal], period: Period) -> Result<Vec<TimeBucket>> {
    for (index, proposal) in proposals.iter().enumerate() {
        proposal.validate(index)?;
    }

    let (Some(earliest), Some(latest)) = (
        proposals.iter().map(|p| p.created_at).min(),
        proposals.iter().map(|p| p.created_at).max(),
    ) else {
        return Ok(vec![]);
    };

    let mut buckets = Vec::new();
    let mut start = period.align(earliest);
    while start <= latest {
        let end = period.advance(start);
        buckets.push(TimeBucket::empty(start, end));
        start = end;
    }

    let mut participation_sums = vec![0.0; buckets.len()];

    for proposal in proposals {
        // Last bucket whose start is not after the proposal
        let idx = buckets.partition_point(|b| b.period_start <= proposal.created_at) - 1;
        let bucket = &mut buckets[idx];

        bucket.proposal_count += 1;
        bucket.total_funding += proposal.amount;
        bucket.yes_votes = bucket.yes_votes.saturating_add(proposal.yes_votes);
        bucket.no_votes = bucket.no_votes.saturating_add(proposal.no_votes);
        if proposal.status.is_approved() {
            bucket.approved_count += 1;
        } else if proposal.status.is_rejected() {
            bucket.rejected_count += 1;
        }
        participation_sums[idx] += proposal.participation_rate;
    }

    for (bucket, participation) in buckets.iter_mut().zip(participation_sums) {
        if bucket.proposal_count > 0 {
            let count = bucket.proposal_count as f64;
            bucket.approval_rate = Some(bucket.approved_count as f64 / count * 100.0);
            bucket.average_participation = Some(participation / count);
        }
    }

    tracing::debug!(
        period = period.as_str(),
        proposals = proposals.len(),
        buckets = buckets.len(),
        "Aggregated proposals into buckets"
    );

    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::ProposalStatus;
    use crate::test_utils::{at, proposal};

    #[test]
    fn test_week_alignment_is_monday() {
        // 2024-03-07 is a Thursday
        let start = Period::Week.align(at("2024-03-07"));
        assert_eq!(start, at("2024-03-04"));
        assert_eq!(Period::Week.advance(start), at("2024-03-11"));
    }

    #[test]
    fn test_month_and_quarter_rollover() {
        assert_eq!(Period::Month.advance(at("2023-12-01")), at("2024-01-01"));
        assert_eq!(Period::Quarter.align(at("2024-05-20")), at("2024-04-01"));
        assert_eq!(Period::Quarter.advance(at("2024-10-01")), at("2025-01-01"));
        assert_eq!(Period::Quarter.label(at("2024-04-01")), "2024-Q2");
    }

    #[test]
    fn test_empty_input_yields_no_buckets() {
        let buckets = aggregate(&[], Period::Week).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_gaps_are_emitted_as_empty_buckets() {
        let proposals = vec![
            proposal("a", "grants", 100.0, ProposalStatus::Approved, "2024-01-02"),
            proposal("b", "grants", 50.0, ProposalStatus::Rejected, "2024-01-03"),
            proposal("c", "infra", 300.0, ProposalStatus::Active, "2024-01-24"),
        ];
        let buckets = aggregate(&proposals, Period::Week).unwrap();

        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0].proposal_count, 2);
        assert_eq!(buckets[0].approved_count, 1);
        assert_eq!(buckets[0].rejected_count, 1);
        assert_eq!(buckets[0].approval_rate, Some(50.0));
        assert!((buckets[0].total_funding - 150.0).abs() < 1e-9);

        assert!(buckets[1].is_empty());
        assert_eq!(buckets[1].approval_rate, None);
        assert_eq!(buckets[1].average_participation, None);

        assert_eq!(buckets[3].proposal_count, 1);
        assert_eq!(buckets[3].approval_rate, Some(0.0));

        for pair in buckets.windows(2) {
            assert_eq!(pair[0].period_end, pair[1].period_start);
        }
    }

    #[test]
    fn test_unordered_input_lands_in_right_bucket() {
        let proposals = vec![
            proposal("late", "grants", 10.0, ProposalStatus::Executed, "2024-03-15"),
            proposal("early", "grants", 20.0, ProposalStatus::Draft, "2024-01-10"),
        ];
        let buckets = aggregate(&proposals, Period::Month).unwrap();

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].period_start, at("2024-01-01"));
        assert_eq!(buckets[2].approved_count, 1);
        assert!(buckets[1].is_empty());
    }

    #[test]
    fn test_vote_sums_saturate() {
        let mut a = proposal("a", "grants", 10.0, ProposalStatus::Active, "2024-01-02");
        let mut b = proposal("b", "grants", 10.0, ProposalStatus::Active, "2024-01-03");
        a.yes_votes = u64::MAX - 1;
        b.yes_votes = 5;
        a.no_votes = u64::MAX;
        b.no_votes = u64::MAX;

        let buckets = aggregate(&[a, b], Period::Week).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].yes_votes, u64::MAX);
        assert_eq!(buckets[0].no_votes, u64::MAX);
    }

    #[test]
    fn test_malformed_proposal_fails_whole_batch() {
        let mut bad = proposal("bad", "grants", 10.0, ProposalStatus::Active, "2024-01-10");
        bad.amount = f64::INFINITY;
        let proposals = vec![
            proposal("ok", "grants", 10.0, ProposalStatus::Active, "2024-01-03"),
            bad,
        ];

        let err = aggregate(&proposals, Period::Week).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                index: 1,
                field: "amount",
                ..
            }
        ));
    }

    #[test]
    fn test_metric_lookup() {
        let proposals = vec![proposal(
            "a",
            "grants",
            100.0,
            ProposalStatus::Approved,
            "2024-01-02",
        )];
        let bucket = &aggregate(&proposals, Period::Week).unwrap()[0];
        assert_eq!(bucket.metric(Metric::ProposalCount), Some(1.0));
        assert_eq!(bucket.metric(Metric::ApprovalRate), Some(100.0));
        assert_eq!(bucket.metric(Metric::AverageParticipation), Some(50.0));
        assert_eq!(Metric::TotalFunding.format_value(1234.4), "1234 STX");
    }
}
