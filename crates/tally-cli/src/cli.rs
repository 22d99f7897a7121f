//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tally_core::CalculationFactors;

/// Tally - Governance insights for funding proposals
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Insight feed and success estimates for governance proposals", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Dismissal store path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Engine config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate proposals into time buckets
    Buckets {
        /// Proposal file (.json or .csv)
        #[arg(short, long)]
        proposals: PathBuf,

        /// Bucket size: week, month, quarter (defaults to config)
        #[arg(long)]
        period: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Generate the insight feed
    Insights(InsightsArgs),

    /// Hide an insight from a viewer's feed
    Dismiss {
        /// Viewer whose feed is affected
        #[arg(long, default_value = "default")]
        viewer: String,

        /// Insight id
        id: String,
    },

    /// Undo a dismissal
    Restore {
        #[arg(long, default_value = "default")]
        viewer: String,

        /// Insight id
        id: String,
    },

    /// Forget every dismissal for a viewer
    Clear {
        #[arg(long, default_value = "default")]
        viewer: String,
    },

    /// Estimate the success probability for a set of factors
    Score {
        #[command(flatten)]
        factors: FactorArgs,

        /// Fixed seed for the confidence interval sampling
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        json: bool,
    },

    /// Compare an estimate against hypothetical factor values
    WhatIf {
        #[command(flatten)]
        factors: FactorArgs,

        /// Override as FACTOR=VALUE (repeatable), e.g. --set amount=50
        #[arg(long = "set", value_name = "FACTOR=VALUE")]
        overrides: Vec<String>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct InsightsArgs {
    /// Proposal file (.json or .csv)
    #[arg(short, long)]
    pub proposals: PathBuf,

    /// Viewer whose dismissals apply
    #[arg(long, default_value = "default")]
    pub viewer: String,

    /// The viewer's own past proposals (.json or .csv)
    #[arg(long)]
    pub user_history: Option<PathBuf>,

    /// Id of the viewer's most recent proposal in the proposal file
    #[arg(long)]
    pub last_proposal: Option<String>,

    /// Viewer role: proposer or voter
    #[arg(long, default_value = "voter")]
    pub role: String,

    /// Category the viewer follows (repeatable)
    #[arg(long = "follow")]
    pub follows: Vec<String>,

    /// Only show one insight type: trend, anomaly, comparative, predictive
    #[arg(long = "type")]
    pub insight_type: Option<String>,

    /// Case-insensitive text filter on title and description
    #[arg(short, long)]
    pub search: Option<String>,

    /// Sort order: priority or recency (defaults to config)
    #[arg(long)]
    pub sort: Option<String>,

    /// Maximum number of insights to show
    #[arg(short, long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub json: bool,
}

/// Success model inputs; omitted factors are neutral
#[derive(Args, Debug, Clone, Default)]
pub struct FactorArgs {
    /// Requested amount in STX
    #[arg(long)]
    pub amount: Option<f64>,

    /// Historical approval rate of the category (0-100)
    #[arg(long)]
    pub category_rate: Option<f64>,

    /// Description quality (1-10)
    #[arg(long)]
    pub description_score: Option<f64>,

    /// Proposer reputation (0-100)
    #[arg(long)]
    pub reputation: Option<f64>,

    /// Current voting sentiment (0-100)
    #[arg(long)]
    pub timing: Option<f64>,

    /// Competing proposals level (0-100)
    #[arg(long)]
    pub competition: Option<f64>,
}

impl FactorArgs {
    pub fn to_factors(&self) -> CalculationFactors {
        CalculationFactors {
            amount: self.amount,
            category_success_rate: self.category_rate,
            description_quality_score: self.description_score,
            reputation: self.reputation,
            timing_sentiment: self.timing,
            competition_level: self.competition,
        }
    }
}
