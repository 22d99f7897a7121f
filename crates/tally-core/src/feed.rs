//! Insight feed
//!
//! [`build_feed`] is a pure function of the generated insights, the viewer's
//! dismissed ids and a [`FeedQuery`]. [`FeedManager`] pairs it with an
//! injected [`DismissalStore`] that owns the persisted dismissal state.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::insights::{Insight, InsightType};

/// Feed ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Priority rank descending, then most recent first
    #[default]
    Priority,
    /// Most recent first
    Recency,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Priority => "priority",
            SortBy::Recency => "recency",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "priority" => Ok(SortBy::Priority),
            "recency" | "recent" => Ok(SortBy::Recency),
            _ => Err(format!("Unknown sort: {}", s)),
        }
    }
}

/// Filter, search and sort options for one feed request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedQuery {
    pub insight_type: Option<InsightType>,
    /// Case-insensitive substring matched against title and description
    pub search: Option<String>,
    pub sort: SortBy,
    pub limit: Option<usize>,
}

impl FeedQuery {
    pub fn with_type(mut self, insight_type: InsightType) -> Self {
        self.insight_type = Some(insight_type);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_sort(mut self, sort: SortBy) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Flatten generator outputs, keeping the first insight seen for each id
pub fn merge_insights(batches: Vec<Vec<Insight>>) -> Vec<Insight> {
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|insight| seen.insert(insight.id.clone()))
        .collect()
}

/// Build the feed a viewer sees
///
/// Steps run in a fixed order: drop dismissed ids, filter by type, filter by
/// search text, sort, then truncate to the limit.
pub fn build_feed(
    insights: &[Insight],
    dismissed: &HashSet<String>,
    query: &FeedQuery,
) -> Vec<Insight> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut feed: Vec<Insight> = insights
        .iter()
        .filter(|i| !dismissed.contains(&i.id))
        .filter(|i| query.insight_type.map_or(true, |t| i.insight_type() == t))
        .filter(|i| search.map_or(true, |s| i.matches_search(s)))
        .cloned()
        .collect();

    match query.sort {
        SortBy::Priority => feed.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        }),
        SortBy::Recency => feed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
    }

    if let Some(limit) = query.limit {
        feed.truncate(limit);
    }
    feed
}

/// Persisted dismissed-insight ids, keyed by viewer
pub trait DismissalStore: Send + Sync {
    fn dismissed_ids(&self, viewer: &str) -> Result<HashSet<String>>;

    /// Record a dismissal. Dismissing twice is a no-op.
    fn dismiss(&self, viewer: &str, insight_id: &str) -> Result<()>;

    /// Undo a dismissal. Returns whether the id was dismissed.
    fn restore(&self, viewer: &str, insight_id: &str) -> Result<bool>;

    /// Forget every dismissal for the viewer. Returns how many were removed.
    fn clear(&self, viewer: &str) -> Result<usize>;
}

/// In-process dismissal store
#[derive(Debug, Default)]
pub struct MemoryDismissalStore {
    dismissed: Mutex<HashMap<String, HashSet<String>>>,
}

impl MemoryDismissalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, HashSet<String>>>> {
        self.dismissed
            .lock()
            .map_err(|_| Error::InvalidData("dismissal store lock poisoned".to_string()))
    }
}

impl DismissalStore for MemoryDismissalStore {
    fn dismissed_ids(&self, viewer: &str) -> Result<HashSet<String>> {
        Ok(self.lock()?.get(viewer).cloned().unwrap_or_default())
    }

    fn dismiss(&self, viewer: &str, insight_id: &str) -> Result<()> {
        self.lock()?
            .entry(viewer.to_string())
            .or_default()
            .insert(insight_id.to_string());
        Ok(())
    }

    fn restore(&self, viewer: &str, insight_id: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .get_mut(viewer)
            .map(|ids| ids.remove(insight_id))
            .unwrap_or(false))
    }

    fn clear(&self, viewer: &str) -> Result<usize> {
        Ok(self.lock()?.remove(viewer).map(|ids| ids.len()).unwrap_or(0))
    }
}

/// Feed builder bound to a dismissal store
pub struct FeedManager<S: DismissalStore> {
    store: S,
}

impl<S: DismissalStore> FeedManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the viewer's dismissals and build their feed
    pub fn feed(
        &self,
        viewer: &str,
        insights: &[Insight],
        query: &FeedQuery,
    ) -> Result<Vec<Insight>> {
        let dismissed = self.store.dismissed_ids(viewer)?;
        let feed = build_feed(insights, &dismissed, query);
        tracing::debug!(
            viewer,
            total = insights.len(),
            dismissed = dismissed.len(),
            shown = feed.len(),
            "Built insight feed"
        );
        Ok(feed)
    }

    pub fn dismiss(&self, viewer: &str, insight_id: &str) -> Result<()> {
        self.store.dismiss(viewer, insight_id)?;
        tracing::info!(viewer, insight = insight_id, "Dismissed insight");
        Ok(())
    }

    pub fn restore(&self, viewer: &str, insight_id: &str) -> Result<bool> {
        let restored = self.store.restore(viewer, insight_id)?;
        tracing::info!(viewer, insight = insight_id, restored, "Restored insight");
        Ok(restored)
    }

    pub fn clear(&self, viewer: &str) -> Result<usize> {
        let cleared = self.store.clear(viewer)?;
        tracing::info!(viewer, cleared, "Cleared dismissals");
        Ok(cleared)
    }
}
