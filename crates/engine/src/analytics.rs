//! Feedback log and derived analytics.
//!
//! An append-only in-memory log of query outcomes and user votes.
//! Summaries are always recomputed from the log on demand, never
//! maintained incrementally, so they cannot drift from the records.

use crate::types::QueryMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// User vote on an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Up,
    Down,
    None,
}

/// Terminal outcome of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOutcome {
    /// An answer was produced (fresh or from cache)
    Success,

    /// A remote capability failed or timed out
    Failed(String),

    /// A generated SQL candidate was rejected; carries the reason label
    Rejected(String),
}

/// One logged query. Append-only; only the vote field is ever updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: u64,
    pub query: String,
    pub mode: QueryMode,
    pub outcome: QueryOutcome,
    pub vote: Vote,
    pub from_cache: bool,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Per-mode aggregate statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModeStats {
    pub queries: u64,
    pub successes: u64,
    pub avg_latency_ms: f64,
}

/// Aggregate view over the whole log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_queries: u64,
    pub cache_hit_rate: f64,
    pub up_votes: u64,
    pub down_votes: u64,
    pub avg_latency_ms: f64,
    pub pdf: ModeStats,
    pub csv: ModeStats,
}

/// Append-only feedback log guarded by a mutex.
///
/// Appends and summary reads are mutually exclusive; critical sections
/// are short enough to call from async context.
pub struct FeedbackLog {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl FeedbackLog {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Append a record, returning its id.
    pub fn record(
        &self,
        query: &str,
        mode: QueryMode,
        outcome: QueryOutcome,
        from_cache: bool,
        latency_ms: u64,
    ) -> u64 {
        let mut records = self.lock_records();
        let id = records.len() as u64 + 1;
        records.push(FeedbackRecord {
            id,
            query: query.to_string(),
            mode,
            outcome,
            vote: Vote::None,
            from_cache,
            latency_ms,
            timestamp: Utc::now(),
        });
        id
    }

    /// Set the vote on a record by id. Unknown ids are ignored and logged.
    pub fn vote(&self, id: u64, vote: Vote) {
        let mut records = self.lock_records();
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => record.vote = vote,
            None => tracing::warn!("Vote for unknown feedback record {}", id),
        }
    }

    /// Set the vote on the most recent record matching the query and mode.
    ///
    /// Matching uses the raw query text; returns the record id if found.
    pub fn vote_latest(&self, query: &str, mode: QueryMode, vote: Vote) -> Option<u64> {
        let mut records = self.lock_records();
        let record = records
            .iter_mut()
            .rev()
            .find(|r| r.mode == mode && r.query == query)?;
        record.vote = vote;
        Some(record.id)
    }

    /// Compute a summary fresh from the log.
    pub fn summary(&self) -> AnalyticsSummary {
        let records = self.lock_records();

        let total_queries = records.len() as u64;
        if total_queries == 0 {
            return AnalyticsSummary::default();
        }

        let cache_hits = records.iter().filter(|r| r.from_cache).count() as u64;
        let up_votes = records.iter().filter(|r| r.vote == Vote::Up).count() as u64;
        let down_votes = records.iter().filter(|r| r.vote == Vote::Down).count() as u64;
        let total_latency: u64 = records.iter().map(|r| r.latency_ms).sum();

        AnalyticsSummary {
            total_queries,
            cache_hit_rate: cache_hits as f64 / total_queries as f64,
            up_votes,
            down_votes,
            avg_latency_ms: total_latency as f64 / total_queries as f64,
            pdf: mode_stats(&records, QueryMode::Pdf),
            csv: mode_stats(&records, QueryMode::Csv),
        }
    }

    /// Number of records in the log.
    pub fn len(&self) -> usize {
        self.lock_records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, Vec<FeedbackRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for FeedbackLog {
    fn default() -> Self {
        Self::new()
    }
}

fn mode_stats(records: &[FeedbackRecord], mode: QueryMode) -> ModeStats {
    let in_mode: Vec<&FeedbackRecord> = records.iter().filter(|r| r.mode == mode).collect();
    if in_mode.is_empty() {
        return ModeStats::default();
    }

    let queries = in_mode.len() as u64;
    let successes = in_mode
        .iter()
        .filter(|r| r.outcome == QueryOutcome::Success)
        .count() as u64;
    let total_latency: u64 = in_mode.iter().map(|r| r.latency_ms).sum();

    ModeStats {
        queries,
        successes,
        avg_latency_ms: total_latency as f64 / queries as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_assigns_sequential_ids() {
        let log = FeedbackLog::new();
        let a = log.record("q1", QueryMode::Pdf, QueryOutcome::Success, false, 100);
        let b = log.record("q2", QueryMode::Pdf, QueryOutcome::Success, false, 100);
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn test_summary_three_queries_one_hit_one_upvote() {
        let log = FeedbackLog::new();
        log.record("q1", QueryMode::Pdf, QueryOutcome::Success, false, 300);
        let hit = log.record("q1", QueryMode::Pdf, QueryOutcome::Success, true, 0);
        log.record(
            "count rows",
            QueryMode::Csv,
            QueryOutcome::Success,
            false,
            600,
        );
        log.vote(hit, Vote::Up);

        let summary = log.summary();
        assert_eq!(summary.total_queries, 3);
        assert!((summary.cache_hit_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.up_votes, 1);
        assert_eq!(summary.down_votes, 0);
        assert!((summary.avg_latency_ms - 300.0).abs() < 1e-9);
        assert_eq!(summary.pdf.queries, 2);
        assert_eq!(summary.csv.queries, 1);
    }

    #[test]
    fn test_summary_recomputed_after_vote() {
        let log = FeedbackLog::new();
        let id = log.record("q", QueryMode::Pdf, QueryOutcome::Success, false, 50);

        assert_eq!(log.summary().up_votes, 0);
        log.vote(id, Vote::Up);
        assert_eq!(log.summary().up_votes, 1);
        log.vote(id, Vote::Down);
        let summary = log.summary();
        assert_eq!(summary.up_votes, 0);
        assert_eq!(summary.down_votes, 1);
    }

    #[test]
    fn test_vote_latest_updates_most_recent_match() {
        let log = FeedbackLog::new();
        log.record("same q", QueryMode::Pdf, QueryOutcome::Success, false, 10);
        let newest = log.record("same q", QueryMode::Pdf, QueryOutcome::Success, true, 0);

        let voted = log.vote_latest("same q", QueryMode::Pdf, Vote::Down);
        assert_eq!(voted, Some(newest));

        let summary = log.summary();
        assert_eq!(summary.down_votes, 1);
    }

    #[test]
    fn test_vote_latest_no_match() {
        let log = FeedbackLog::new();
        log.record("q", QueryMode::Pdf, QueryOutcome::Success, false, 10);

        assert!(log.vote_latest("q", QueryMode::Csv, Vote::Up).is_none());
        assert!(log.vote_latest("other", QueryMode::Pdf, Vote::Up).is_none());
    }

    #[test]
    fn test_empty_summary() {
        let log = FeedbackLog::new();
        let summary = log.summary();
        assert_eq!(summary.total_queries, 0);
        assert_eq!(summary.cache_hit_rate, 0.0);
        assert_eq!(summary.avg_latency_ms, 0.0);
    }

    #[test]
    fn test_rejected_outcome_not_counted_as_success() {
        let log = FeedbackLog::new();
        log.record(
            "drop it",
            QueryMode::Csv,
            QueryOutcome::Rejected("unsafe statement".to_string()),
            false,
            20,
        );

        let summary = log.summary();
        assert_eq!(summary.csv.queries, 1);
        assert_eq!(summary.csv.successes, 0);
    }
}
