//! Tally CLI - Governance insight engine
//!
//! Usage:
//!   tally buckets --proposals FILE           Aggregate proposals by period
//!   tally insights --proposals FILE          Show the insight feed
//!   tally dismiss --viewer V ID              Hide an insight
//!   tally score --amount 250                 Estimate success probability
//!   tally what-if --amount 250 --set amount=100

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Buckets {
            proposals,
            period,
            json,
        } => commands::cmd_buckets(&config, &proposals, period.as_deref(), json),
        Commands::Insights(args) => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_insights(&db, &config, &args)
        }
        Commands::Dismiss { viewer, id } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_dismiss(&db, &viewer, &id)
        }
        Commands::Restore { viewer, id } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_restore(&db, &viewer, &id)
        }
        Commands::Clear { viewer } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_clear(&db, &viewer)
        }
        Commands::Score {
            factors,
            seed,
            json,
        } => commands::cmd_score(&config, &factors, seed, json),
        Commands::WhatIf {
            factors,
            overrides,
            seed,
            json,
        } => commands::cmd_what_if(&config, &factors, &overrides, seed, json),
    }
}
