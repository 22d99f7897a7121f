//! Domain models for Tally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle status of a funding proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Draft,
    Active,
    Approved,
    Rejected,
    Executed,
    Archived,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
            Self::Archived => "archived",
        }
    }

    /// Executed proposals passed the vote, so they count as approved
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved | Self::Executed)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    /// Whether voting has concluded one way or the other
    pub fn is_decided(&self) -> bool {
        self.is_approved() || self.is_rejected()
    }
}

impl std::str::FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "executed" => Ok(Self::Executed),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Unknown proposal status: {}", s)),
        }
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A funding proposal with its vote tally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub title: String,
    /// Free-form proposal body, when the source provides one
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    /// Requested amount in STX
    pub amount: f64,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
    pub yes_votes: u64,
    pub no_votes: u64,
    /// Percentage of eligible voters that took part (0-100)
    pub participation_rate: f64,
}

impl Proposal {
    /// Check numeric invariants. `index` is the position in the caller's batch.
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation {
                index,
                field: "id",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(Error::Validation {
                index,
                field: "amount",
                reason: format!("must be a finite non-negative number, got {}", self.amount),
            });
        }
        if !self.participation_rate.is_finite()
            || !(0.0..=100.0).contains(&self.participation_rate)
        {
            return Err(Error::Validation {
                index,
                field: "participation_rate",
                reason: format!("must be within 0-100, got {}", self.participation_rate),
            });
        }
        Ok(())
    }

    pub fn total_votes(&self) -> u64 {
        self.yes_votes.saturating_add(self.no_votes)
    }
}

/// Role of the viewer requesting insights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Proposer,
    #[default]
    Voter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposer => "proposer",
            Self::Voter => "voter",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "proposer" => Ok(Self::Proposer),
            "voter" => Ok(Self::Voter),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-request viewer context. Supplied by the caller, never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    pub role: Role,
    #[serde(default)]
    pub last_proposal: Option<Proposal>,
    #[serde(default)]
    pub history: Vec<Proposal>,
    /// Categories or topics the viewer follows
    #[serde(default)]
    pub preferences: Vec<String>,
}

impl UserContext {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<Proposal>) -> Self {
        self.history = history;
        self
    }

    pub fn with_last_proposal(mut self, proposal: Proposal) -> Self {
        self.last_proposal = Some(proposal);
        self
    }

    pub fn with_preferences(mut self, preferences: Vec<String>) -> Self {
        self.preferences = preferences;
        self
    }

    /// Whether the viewer follows this category (case-insensitive)
    pub fn follows(&self, category: &str) -> bool {
        self.preferences
            .iter()
            .any(|p| p.eq_ignore_ascii_case(category))
    }

    /// Whether the viewer has proposed in this category before
    pub fn has_proposed_in(&self, category: &str) -> bool {
        self.history
            .iter()
            .any(|p| p.category.eq_ignore_ascii_case(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::proposal;
    use std::str::FromStr;

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            ProposalStatus::from_str("Executed").unwrap(),
            ProposalStatus::Executed
        );
        assert!(ProposalStatus::from_str("pending").is_err());
        assert!(ProposalStatus::Executed.is_approved());
        assert!(!ProposalStatus::Active.is_decided());
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let mut p = proposal("p1", "grants", 100.0, ProposalStatus::Active, "2024-01-01");
        assert!(p.validate(0).is_ok());

        p.amount = f64::NAN;
        let err = p.validate(3).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                index: 3,
                field: "amount",
                ..
            }
        ));

        p.amount = 10.0;
        p.participation_rate = 140.0;
        assert!(matches!(
            p.validate(0),
            Err(Error::Validation {
                field: "participation_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_total_votes_saturates() {
        let mut p = proposal("p1", "grants", 100.0, ProposalStatus::Active, "2024-01-01");
        p.yes_votes = u64::MAX;
        p.no_votes = 7;
        assert_eq!(p.total_votes(), u64::MAX);
    }

    #[test]
    fn test_user_context_follows() {
        let ctx = UserContext::new(Role::Voter).with_preferences(vec!["Grants".to_string()]);
        assert!(ctx.follows("grants"));
        assert!(!ctx.follows("infra"));
    }
}
