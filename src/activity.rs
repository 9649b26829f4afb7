//! Bounded in-memory log of recent translations.
//!
//! Entries are evicted lazily on every access: first anything older than the
//! retention window, then the oldest entries beyond the size cap. Excerpts are
//! truncated once, when recorded.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Characters kept from each side of a translation.
pub const EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub from: String,
    pub to: String,
    pub source_excerpt: String,
    pub translated_excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityStats {
    pub total_entries: usize,
    pub last_minute_count: usize,
    pub oldest_timestamp: Option<DateTime<Utc>>,
    pub newest_timestamp: Option<DateTime<Utc>>,
}

pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityEntry>>,
    max_entries: usize,
    retention: ChronoDuration,
}

impl ActivityLog {
    pub fn new(max_entries: usize, retention: Duration) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries,
            retention: ChronoDuration::from_std(retention).unwrap_or(ChronoDuration::MAX),
        }
    }

    pub fn record(&self, from: &str, to: &str, source: &str, translated: &str) {
        self.record_at(Utc::now(), from, to, source, translated);
    }

    /// The most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        self.recent_at(Utc::now(), limit)
    }

    pub fn stats(&self) -> ActivityStats {
        self.stats_at(Utc::now())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ActivityEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record_at(&self, now: DateTime<Utc>, from: &str, to: &str, source: &str, translated: &str) {
        let mut entries = self.lock();

        // Keep timestamps non-decreasing even if the wall clock steps back.
        let timestamp = match entries.back() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        entries.push_back(ActivityEntry {
            timestamp,
            from: from.to_string(),
            to: to.to_string(),
            source_excerpt: excerpt(source),
            translated_excerpt: excerpt(translated),
        });
        self.evict(&mut entries, now);
    }

    fn recent_at(&self, now: DateTime<Utc>, limit: usize) -> Vec<ActivityEntry> {
        let mut entries = self.lock();
        self.evict(&mut entries, now);

        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    fn stats_at(&self, now: DateTime<Utc>) -> ActivityStats {
        let mut entries = self.lock();
        self.evict(&mut entries, now);

        let minute_ago = now - ChronoDuration::minutes(1);
        let last_minute_count = entries
            .iter()
            .rev()
            .take_while(|e| e.timestamp > minute_ago)
            .count();

        ActivityStats {
            total_entries: entries.len(),
            last_minute_count,
            oldest_timestamp: entries.front().map(|e| e.timestamp),
            newest_timestamp: entries.back().map(|e| e.timestamp),
        }
    }

    fn evict(&self, entries: &mut VecDeque<ActivityEntry>, now: DateTime<Utc>) {
        let cutoff = now.checked_sub_signed(self.retention);
        if let Some(cutoff) = cutoff {
            while entries.front().is_some_and(|e| e.timestamp < cutoff) {
                entries.pop_front();
            }
        }

        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
