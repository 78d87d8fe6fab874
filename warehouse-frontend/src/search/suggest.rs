use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Queries shorter than this are not sent to the API.
pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_SUGGESTIONS: usize = 8;

/// Trailing-edge debounce keyed by session.
///
/// Each call stamps the key and waits out the delay. Only the call whose
/// stamp is still the latest afterwards proceeds.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    latest: DashMap<String, u64>,
    counter: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: DashMap::new(),
            counter: AtomicU64::new(0),
        }
    }

    /// `true` if no newer call for `key` arrived during the delay.
    ///
    /// A call dropped mid-delay clears its own stamp.
    pub async fn settle(&self, key: &str) -> bool {
        let stamp = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.latest.insert(key.to_string(), stamp);
        let pending = PendingStamp {
            latest: &self.latest,
            key,
            stamp,
            released: false,
        };

        tokio::time::sleep(self.delay).await;

        pending.release()
    }

    pub fn forget(&self, key: &str) {
        self.latest.remove(key);
    }

    pub fn pending(&self) -> usize {
        self.latest.len()
    }
}

struct PendingStamp<'a> {
    latest: &'a DashMap<String, u64>,
    key: &'a str,
    stamp: u64,
    released: bool,
}

impl PendingStamp<'_> {
    /// Remove the stamp if it is still the latest for its key.
    fn release(mut self) -> bool {
        self.released = true;
        let stamp = self.stamp;
        self.latest
            .remove_if(self.key, |_, latest| *latest == stamp)
            .is_some()
    }
}

impl Drop for PendingStamp<'_> {
    fn drop(&mut self) {
        if !self.released {
            let stamp = self.stamp;
            self.latest.remove_if(self.key, |_, latest| *latest == stamp);
        }
    }
}

/// Suggestion dropdown state for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionList {
    pub query: String,
    pub items: Vec<String>,
}

impl SuggestionList {
    pub fn closed(query: &str) -> Self {
        Self {
            query: query.trim().to_string(),
            items: Vec::new(),
        }
    }

    /// Trimmed, de-duplicated (case-insensitive) and capped.
    pub fn from_results(query: &str, results: Vec<String>) -> Self {
        let mut items: Vec<String> = Vec::new();
        for label in results {
            let label = label.trim();
            if label.is_empty() || items.iter().any(|seen| seen.eq_ignore_ascii_case(label)) {
                continue;
            }
            items.push(label.to_string());
            if items.len() == MAX_SUGGESTIONS {
                break;
            }
        }
        Self {
            query: query.trim().to_string(),
            items,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn wants_lookup(query: &str) -> bool {
        query.trim().chars().count() >= MIN_QUERY_LEN
    }
}
