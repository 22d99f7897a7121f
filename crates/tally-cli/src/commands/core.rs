//! Shared utilities for command implementations
//!
//! This module contains:
//! - `open_db` - Open the dismissal store
//! - `load_config` - Resolve the engine config
//! - `load_proposals` - Read a proposal file

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{config::EngineConfig, db::Database, import, Proposal};

/// Open (or create) the dismissal store
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    Database::new(path_str).context("Failed to open database")
}

/// Load config from `--config`, the data-dir override, or built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load(path).context("Failed to load engine config")
}

/// Read proposals from a .json or .csv file
pub fn load_proposals(path: &Path) -> Result<Vec<Proposal>> {
    import::load_file(path)
        .with_context(|| format!("Failed to load proposals from {}", path.display()))
}
