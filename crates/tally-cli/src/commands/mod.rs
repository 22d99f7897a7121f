//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db, load_config, load_proposals)
//! - `dismissals` - Dismiss, restore and clear commands
//! - `insights` - Bucket and insight feed commands
//! - `score` - Success estimate and what-if commands

pub mod core;
pub mod dismissals;
pub mod insights;
pub mod score;

// Re-export command functions for main.rs
pub use core::*;
pub use dismissals::*;
pub use insights::*;
pub use score::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
