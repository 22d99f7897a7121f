//! Tally Core Library
//!
//! Governance insight engine for funding proposals:
//! - Proposal import from JSON and CSV
//! - Time-series aggregation into week/month/quarter buckets
//! - Trend, anomaly, comparative and predictive insight generators
//! - Weighted-factor success model with a seedable confidence interval
//! - Insight feed with per-viewer dismissals (in-memory or SQLite)
//! - Layered engine configuration

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod import;
pub mod insights;
pub mod models;
pub mod scoring;
pub mod timeseries;

/// Proposal and bucket fixture builders
#[cfg(test)]
pub mod test_utils;

pub use config::EngineConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use feed::{
    build_feed, merge_insights, DismissalStore, FeedManager, FeedQuery, MemoryDismissalStore,
    SortBy,
};
pub use insights::{
    AnalysisContext, Insight, InsightEngine, InsightGenerator, InsightPayload, InsightType,
    Priority, Recommendation,
};
pub use models::{Proposal, ProposalStatus, Role, UserContext};
pub use scoring::{
    CalculationFactors, FactorContribution, FactorKind, ProbabilityResult, SuccessModel,
    WhatIfResult,
};
pub use timeseries::{aggregate, Metric, Period, TimeBucket};
