//! Dismissed insight persistence

use std::collections::HashSet;

use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::feed::DismissalStore;

impl Database {
    /// Ids dismissed by `viewer` with the time of each dismissal, newest first
    pub fn list_dismissals(&self, viewer: &str) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT insight_id, dismissed_at FROM dismissed_insights
            WHERE viewer = ?
            ORDER BY dismissed_at DESC, insight_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![viewer], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
        Ok(rows)
    }
}

impl DismissalStore for Database {
    fn dismissed_ids(&self, viewer: &str) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT insight_id FROM dismissed_insights WHERE viewer = ?")?;
        let ids = stmt
            .query_map(params![viewer], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(ids)
    }

    fn dismiss(&self, viewer: &str, insight_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO dismissed_insights (viewer, insight_id) VALUES (?, ?)",
            params![viewer, insight_id],
        )?;
        Ok(())
    }

    fn restore(&self, viewer: &str, insight_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM dismissed_insights WHERE viewer = ? AND insight_id = ?",
            params![viewer, insight_id],
        )?;
        Ok(removed > 0)
    }

    fn clear(&self, viewer: &str) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM dismissed_insights WHERE viewer = ?",
            params![viewer],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dismiss_and_restore() {
        let db = Database::in_memory().unwrap();

        db.dismiss("alice", "trend-0011").unwrap();
        // Second dismissal is ignored
        db.dismiss("alice", "trend-0011").unwrap();
        db.dismiss("alice", "anomaly-0022").unwrap();
        db.dismiss("bob", "trend-0011").unwrap();

        let ids = db.dismissed_ids("alice").unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("anomaly-0022"));
        assert_eq!(db.list_dismissals("alice").unwrap().len(), 2);

        assert!(db.restore("alice", "trend-0011").unwrap());
        assert!(!db.restore("alice", "trend-0011").unwrap());
        assert_eq!(db.dismissed_ids("alice").unwrap().len(), 1);
        assert_eq!(db.dismissed_ids("bob").unwrap().len(), 1);
    }

    #[test]
    fn test_clear_only_touches_one_viewer() {
        let db = Database::in_memory().unwrap();
        db.dismiss("alice", "a").unwrap();
        db.dismiss("alice", "b").unwrap();
        db.dismiss("bob", "a").unwrap();

        assert_eq!(db.clear("alice").unwrap(), 2);
        assert!(db.dismissed_ids("alice").unwrap().is_empty());
        assert_eq!(db.clear("alice").unwrap(), 0);
        assert_eq!(db.dismissed_ids("bob").unwrap().len(), 1);
    }

    #[test]
    fn test_dismissals_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");
        let path = path.to_str().unwrap();

        Database::new(path).unwrap().dismiss("alice", "x").unwrap();
        let reopened = Database::new(path).unwrap();
        assert!(reopened.dismissed_ids("alice").unwrap().contains("x"));
        assert_eq!(reopened.path(), path);
    }
}
