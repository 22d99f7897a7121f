//! Proposal ingestion from JSON and CSV
//!
//! Every field of a [`ProposalRecord`] is optional so a bad row can be
//! reported by index and field name instead of an opaque parse error. One
//! invalid record fails the whole batch.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Proposal, ProposalStatus};

/// A proposal as it appears in an input file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposalRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<String>,
    #[serde(alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(alias = "approvedAt")]
    pub approved_at: Option<String>,
    #[serde(alias = "executedAt")]
    pub executed_at: Option<String>,
    #[serde(alias = "yesVotes")]
    pub yes_votes: Option<u64>,
    #[serde(alias = "noVotes")]
    pub no_votes: Option<u64>,
    #[serde(alias = "participationRate")]
    pub participation_rate: Option<f64>,
}

fn required_text(value: Option<String>, index: usize, field: &'static str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::missing(index, field))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a timestamp: RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare date (midnight UTC)
fn parse_timestamp(s: &str, index: usize, field: &'static str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts.and_utc());
    }
    if let Some(ts) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(ts.and_utc());
    }
    Err(Error::Validation {
        index,
        field,
        reason: format!("is not a valid timestamp: {}", s),
    })
}

fn optional_timestamp(
    value: Option<String>,
    index: usize,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>> {
    optional_text(value)
        .map(|s| parse_timestamp(&s, index, field))
        .transpose()
}

impl ProposalRecord {
    /// Convert into a validated proposal. `index` is the record's position in its batch.
    pub fn into_proposal(self, index: usize) -> Result<Proposal> {
        let id = required_text(self.id, index, "id")?;
        let title = required_text(self.title, index, "title")?;
        let category = required_text(self.category, index, "category")?;
        let amount = self.amount.ok_or_else(|| Error::missing(index, "amount"))?;

        let status_text = required_text(self.status, index, "status")?;
        let status: ProposalStatus = status_text.parse().map_err(|reason| Error::Validation {
            index,
            field: "status",
            reason,
        })?;

        let created_text = required_text(self.created_at, index, "created_at")?;
        let created_at = parse_timestamp(&created_text, index, "created_at")?;

        let proposal = Proposal {
            id,
            title,
            description: optional_text(self.description),
            category,
            amount,
            status,
            created_at,
            approved_at: optional_timestamp(self.approved_at, index, "approved_at")?,
            executed_at: optional_timestamp(self.executed_at, index, "executed_at")?,
            yes_votes: self.yes_votes.ok_or_else(|| Error::missing(index, "yes_votes"))?,
            no_votes: self.no_votes.ok_or_else(|| Error::missing(index, "no_votes"))?,
            participation_rate: self
                .participation_rate
                .ok_or_else(|| Error::missing(index, "participation_rate"))?,
        };
        proposal.validate(index)?;
        Ok(proposal)
    }
}

fn convert(records: Vec<ProposalRecord>) -> Result<Vec<Proposal>> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_proposal(index))
        .collect()
}

/// Parse a JSON array of proposal records
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<Proposal>> {
    let records: Vec<ProposalRecord> = serde_json::from_reader(reader)?;
    let proposals = convert(records)?;
    debug!("Parsed {} proposals from JSON", proposals.len());
    Ok(proposals)
}

/// Parse CSV with a header row naming the record fields
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Proposal>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let records = rdr
        .deserialize::<ProposalRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let proposals = convert(records)?;
    debug!("Parsed {} proposals from CSV", proposals.len());
    Ok(proposals)
}

/// Load proposals from a `.json` or `.csv` file, chosen by extension
pub fn load_file(path: &Path) -> Result<Vec<Proposal>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => parse_json(BufReader::new(File::open(path)?)),
        Some("csv") => parse_csv(BufReader::new(File::open(path)?)),
        _ => Err(Error::InvalidData(format!(
            "Unsupported proposal file (expected .json or .csv): {}",
            path.display()
        ))),
    }
}
