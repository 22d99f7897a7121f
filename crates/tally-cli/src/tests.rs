//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::path::PathBuf;

use clap::Parser;
use tally_core::db::Database;
use tally_core::{DismissalStore, EngineConfig, FactorKind, InsightType, SortBy};
use tempfile::TempDir;

use crate::cli::{Cli, Commands, FactorArgs, InsightsArgs};
use crate::commands::{self, truncate};

const PROPOSALS_CSV: &str = "\
id,title,category,amount,status,created_at,yes_votes,no_votes,participation_rate
p1,Grant one,grants,100,approved,2024-01-01,60,40,30
p2,Grant two,grants,120,approved,2024-01-02,60,40,30
p3,Infra one,infra,900,rejected,2024-01-08,20,80,30
p4,Infra two,infra,950,rejected,2024-01-09,25,75,30
p5,Infra three,infra,400,approved,2024-01-15,55,45,30
p6,Infra four,infra,800,active,2024-01-16,10,10,30
";

fn write_proposals(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("proposals.csv");
    std::fs::write(&path, PROPOSALS_CSV).unwrap();
    path
}

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn insights_args(proposals: PathBuf) -> InsightsArgs {
    InsightsArgs {
        proposals,
        viewer: "default".to_string(),
        user_history: None,
        last_proposal: None,
        role: "voter".to_string(),
        follows: vec![],
        insight_type: None,
        search: None,
        sort: None,
        limit: None,
        json: false,
    }
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_insights_args() {
    let cli = Cli::try_parse_from([
        "tally",
        "--db",
        "/tmp/x.db",
        "insights",
        "--proposals",
        "p.csv",
        "--type",
        "trend",
        "--follow",
        "grants",
        "--follow",
        "infra",
        "--limit",
        "5",
    ])
    .unwrap();

    assert_eq!(cli.db, PathBuf::from("/tmp/x.db"));
    match cli.command {
        Commands::Insights(args) => {
            assert_eq!(args.insight_type.as_deref(), Some("trend"));
            assert_eq!(args.follows, vec!["grants", "infra"]);
            assert_eq!(args.limit, Some(5));
            assert_eq!(args.viewer, "default");
        }
        _ => panic!("expected insights command"),
    }
}

#[test]
fn test_parse_what_if_overrides() {
    let cli = Cli::try_parse_from([
        "tally",
        "what-if",
        "--amount",
        "500",
        "--set",
        "amount=100",
        "--set",
        "reputation=80",
        "--verbose",
    ])
    .unwrap();

    assert!(cli.verbose);
    match cli.command {
        Commands::WhatIf {
            factors, overrides, ..
        } => {
            assert_eq!(factors.amount, Some(500.0));
            assert_eq!(overrides, vec!["amount=100", "reputation=80"]);
        }
        _ => panic!("expected what-if command"),
    }
}

#[test]
fn test_dismiss_requires_id() {
    assert!(Cli::try_parse_from(["tally", "dismiss", "--viewer", "alice"]).is_err());
}

#[test]
fn test_parse_override() {
    let (factor, value) = commands::parse_override("category_rate = 75").unwrap();
    assert_eq!(factor, FactorKind::CategorySuccessRate);
    assert_eq!(value, 75.0);

    assert!(commands::parse_override("amount").is_err());
    assert!(commands::parse_override("luck=5").is_err());
    assert!(commands::parse_override("amount=lots").is_err());
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a longer sentence", 10), "a longe...");
}

// ========== Command Tests ==========

#[test]
fn test_cmd_buckets() {
    let dir = TempDir::new().unwrap();
    let path = write_proposals(&dir);
    let config = EngineConfig::default();

    assert!(commands::cmd_buckets(&config, &path, None, false).is_ok());
    assert!(commands::cmd_buckets(&config, &path, Some("month"), true).is_ok());
    assert!(commands::cmd_buckets(&config, &path, Some("fortnight"), false).is_err());
}

#[test]
fn test_cmd_buckets_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.csv");
    assert!(commands::cmd_buckets(&EngineConfig::default(), &missing, None, false).is_err());
}

#[test]
fn test_cmd_insights_with_viewer() {
    let dir = TempDir::new().unwrap();
    let db = setup_test_db();
    let mut args = insights_args(write_proposals(&dir));
    args.last_proposal = Some("p6".to_string());
    args.role = "proposer".to_string();
    args.follows = vec!["infra".to_string()];

    assert!(commands::cmd_insights(&db, &EngineConfig::default(), &args).is_ok());

    args.json = true;
    args.insight_type = Some("predictive".to_string());
    assert!(commands::cmd_insights(&db, &EngineConfig::default(), &args).is_ok());
}

#[test]
fn test_cmd_insights_unknown_last_proposal() {
    let dir = TempDir::new().unwrap();
    let db = setup_test_db();
    let mut args = insights_args(write_proposals(&dir));
    args.last_proposal = Some("missing".to_string());

    assert!(commands::cmd_insights(&db, &EngineConfig::default(), &args).is_err());
}

#[test]
fn test_feed_query_from_args() {
    let dir = TempDir::new().unwrap();
    let mut args = insights_args(write_proposals(&dir));

    let query = commands::feed_query(&args, SortBy::Recency).unwrap();
    assert_eq!(query.sort, SortBy::Recency);
    assert_eq!(query.insight_type, None);

    args.sort = Some("priority".to_string());
    args.insight_type = Some("anomaly".to_string());
    let query = commands::feed_query(&args, SortBy::Recency).unwrap();
    assert_eq!(query.sort, SortBy::Priority);
    assert_eq!(query.insight_type, Some(InsightType::Anomaly));

    args.insight_type = Some("gossip".to_string());
    assert!(commands::feed_query(&args, SortBy::Priority).is_err());
}

#[test]
fn test_cmd_dismiss_restore_clear() {
    let db = setup_test_db();

    commands::cmd_dismiss(&db, "alice", "trend-0123").unwrap();
    assert!(db.dismissed_ids("alice").unwrap().contains("trend-0123"));

    commands::cmd_restore(&db, "alice", "trend-0123").unwrap();
    assert!(db.dismissed_ids("alice").unwrap().is_empty());

    // Restoring something that was never dismissed is not an error
    assert!(commands::cmd_restore(&db, "alice", "trend-0123").is_ok());

    commands::cmd_dismiss(&db, "alice", "a").unwrap();
    commands::cmd_dismiss(&db, "alice", "b").unwrap();
    commands::cmd_clear(&db, "alice").unwrap();
    assert!(db.dismissed_ids("alice").unwrap().is_empty());
}

#[test]
fn test_cmd_score_and_what_if() {
    let config = EngineConfig::default();
    let factors = FactorArgs {
        amount: Some(400.0),
        reputation: Some(20.0),
        ..FactorArgs::default()
    };

    assert!(commands::cmd_score(&config, &factors, Some(7), false).is_ok());
    assert!(commands::cmd_score(&config, &FactorArgs::default(), None, true).is_ok());

    let overrides = vec!["amount=50".to_string()];
    assert!(commands::cmd_what_if(&config, &factors, &overrides, Some(7), false).is_ok());

    let bad = vec!["amount:50".to_string()];
    assert!(commands::cmd_what_if(&config, &factors, &bad, Some(7), false).is_err());
}

#[test]
fn test_open_db_and_load_config() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("tally.db");
    assert!(commands::open_db(&db_path).is_ok());
    assert!(db_path.exists());

    let config_path = dir.path().join("engine.toml");
    std::fs::write(&config_path, "[feed]\nsort = \"recency\"\n").unwrap();
    let config = commands::load_config(Some(&config_path)).unwrap();
    assert_eq!(config.default_sort, SortBy::Recency);
}
