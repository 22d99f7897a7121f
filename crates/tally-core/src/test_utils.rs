//! Test utilities for tally-core
//!
//! Fixture builders for proposals and bucket series shared by unit tests.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{Proposal, ProposalStatus};
use crate::timeseries::{Period, TimeBucket};

/// Midnight UTC on a `YYYY-MM-DD` date
pub fn at(date: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// A proposal with plausible vote numbers for its status
pub fn proposal(
    id: &str,
    category: &str,
    amount: f64,
    status: ProposalStatus,
    created: &str,
) -> Proposal {
    let (yes, no) = match status {
        s if s.is_approved() => (70, 30),
        ProposalStatus::Rejected => (25, 75),
        _ => (10, 10),
    };
    Proposal {
        id: id.to_string(),
        title: format!("Proposal {}", id),
        description: None,
        category: category.to_string(),
        amount,
        status,
        created_at: at(created),
        approved_at: None,
        executed_at: None,
        yes_votes: yes,
        no_votes: no,
        participation_rate: 50.0,
    }
}

/// Consecutive buckets starting at `start`, one per `(count, funding, approved)` row.
/// Rejected count is whatever is left over after approvals.
pub fn bucket_series(start: &str, period: Period, rows: &[(u32, f64, u32)]) -> Vec<TimeBucket> {
    let mut period_start = period.align(at(start));
    rows.iter()
        .map(|&(count, funding, approved)| {
            let period_end = period.advance(period_start);
            let bucket = TimeBucket {
                period_start,
                period_end,
                proposal_count: count,
                total_funding: funding,
                approved_count: approved,
                rejected_count: count.saturating_sub(approved),
                approval_rate: if count > 0 {
                    Some(approved as f64 / count as f64 * 100.0)
                } else {
                    None
                },
                yes_votes: 0,
                no_votes: 0,
                average_participation: if count > 0 { Some(50.0) } else { None },
            };
            period_start = period_end;
            bucket
        })
        .collect()
}

/// `n` proposals in one category, `approved` of them approved and the rest rejected
pub fn category_batch(
    prefix: &str,
    category: &str,
    n: usize,
    approved: usize,
    amount: f64,
    created: &str,
) -> Vec<Proposal> {
    (0..n)
        .map(|i| {
            let status = if i < approved {
                ProposalStatus::Approved
            } else {
                ProposalStatus::Rejected
            };
            proposal(&format!("{}-{}", prefix, i), category, amount, status, created)
        })
        .collect()
}
