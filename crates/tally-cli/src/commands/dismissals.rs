//! Dismissal commands (dismiss, restore, clear)

use anyhow::{Context, Result};
use tally_core::{db::Database, FeedManager};

pub fn cmd_dismiss(db: &Database, viewer: &str, insight_id: &str) -> Result<()> {
    FeedManager::new(db.clone())
        .dismiss(viewer, insight_id)
        .context("Failed to dismiss insight")?;
    println!("🙈 Dismissed {} for {}", insight_id, viewer);
    Ok(())
}

pub fn cmd_restore(db: &Database, viewer: &str, insight_id: &str) -> Result<()> {
    let restored = FeedManager::new(db.clone())
        .restore(viewer, insight_id)
        .context("Failed to restore insight")?;
    if restored {
        println!("✅ Restored {} for {}", insight_id, viewer);
    } else {
        println!("   {} was not dismissed for {}", insight_id, viewer);
    }
    Ok(())
}

pub fn cmd_clear(db: &Database, viewer: &str) -> Result<()> {
    let cleared = FeedManager::new(db.clone())
        .clear(viewer)
        .context("Failed to clear dismissals")?;
    println!("🧹 Cleared {} dismissals for {}", cleared, viewer);
    Ok(())
}
