//! crates/web_summarizer_core/src/history.rs
//!
//! Append-only, session-scoped log of past summaries.

use crate::domain::HistoryEntry;

/// How many entries the history view shows by default.
pub const DEFAULT_DISPLAY_LIMIT: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Up to `n` entries, most recent first. The full log is kept.
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn entry(i: i64) -> HistoryEntry {
        HistoryEntry {
            created_at: Utc::now() + Duration::seconds(i),
            url: format!("https://example.com/{i}"),
            summary: format!("summary {i}"),
        }
    }

    #[test]
    fn recent_returns_newest_first_and_caps_the_view() {
        let mut log = HistoryLog::new();
        for i in 0..8 {
            log.append(entry(i));
        }

        let recent = log.recent(DEFAULT_DISPLAY_LIMIT);
        let urls: Vec<_> = recent.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/7",
                "https://example.com/6",
                "https://example.com/5",
                "https://example.com/4",
                "https://example.com/3",
            ]
        );
        // Viewing does not drop anything.
        assert_eq!(log.len(), 8);
    }

    #[test]
    fn recent_on_short_log_returns_everything() {
        let mut log = HistoryLog::new();
        assert!(log.recent(5).is_empty());
        log.append(entry(0));
        assert_eq!(log.recent(5).len(), 1);
    }
}
