//! Listing results for one browser session.
//!
//! Every fetch is issued as a [`FetchTicket`] carrying the feed's generation
//! at issue time. Only the ticket of the latest generation may settle the
//! feed; earlier responses are dropped, so the last request wins.

use dashmap::DashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::models::filter::FETCH_ALL_LIMIT;
use crate::models::{Filter, ListingQuery, Pagination, Warehouse};
use crate::services::Listing;

#[derive(Debug, Clone, PartialEq)]
#[must_use = "a ticket that is never settled leaves the feed loading"]
pub struct FetchTicket {
    generation: u64,
    pub query: ListingQuery,
    pub public: bool,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Applied,
    Stale,
    /// The requested page lies past the last one. The total is recorded and
    /// the feed stays loading until a clamped page is fetched.
    PastLastPage,
}

/// What a results fragment renders.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub filter: Filter,
    pub items: Vec<Warehouse>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct ResultFeed {
    filter: Filter,
    page: u32,
    limit: u32,
    public: bool,
    generation: u64,
    loading: bool,
    items: Vec<Warehouse>,
    total: u64,
    /// Total from the last successful fetch under the current filter.
    known_total: Option<u64>,
}

impl ResultFeed {
    pub fn new(limit: u32) -> Self {
        Self {
            filter: Filter::default(),
            page: 1,
            limit: limit.max(1),
            public: true,
            generation: 0,
            loading: false,
            items: Vec::new(),
            total: 0,
            known_total: None,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Commit a new filter set. Always restarts from the first page.
    pub fn apply_filter(&mut self, filter: Filter) -> FetchTicket {
        self.filter = filter;
        self.known_total = None;
        self.page = 1;
        self.issue()
    }

    /// Move to `page`, clamped to the last page once the total is known.
    pub fn goto_page(&mut self, page: u32) -> FetchTicket {
        self.page = match self.known_total {
            Some(total) => page.clamp(1, self.last_page(total)),
            None => page.max(1),
        };
        self.issue()
    }

    fn last_page(&self, total: u64) -> u32 {
        Pagination::new(1, self.limit, total).pages.max(1)
    }

    pub fn set_public(&mut self, public: bool) -> FetchTicket {
        self.public = public;
        self.issue()
    }

    /// Bring the feed in line with one incoming request.
    ///
    /// A changed filter goes through [`apply_filter`](Self::apply_filter),
    /// except on a fresh feed, where a bookmarked page is honoured.
    pub fn sync(&mut self, filter: Filter, page: u32, public: bool) -> FetchTicket {
        self.public = public;
        if self.generation > 0 && filter != self.filter {
            return self.apply_filter(filter);
        }
        if filter != self.filter {
            self.known_total = None;
        }
        self.filter = filter;
        self.goto_page(page)
    }

    fn issue(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        let query = if self.filter.fetch_all {
            self.filter.to_query(1, FETCH_ALL_LIMIT)
        } else {
            self.filter.to_query(self.page, self.limit)
        };
        FetchTicket {
            generation: self.generation,
            query,
            public: self.public,
        }
    }

    /// Apply a fetch outcome if `ticket` is still current.
    ///
    /// A failure empties the list; the error is logged, never returned.
    pub fn settle(&mut self, ticket: &FetchTicket, outcome: Result<Listing, ApiError>) -> Settled {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Dropping superseded listing response"
            );
            return Settled::Stale;
        }

        if let Ok(listing) = &outcome {
            let past_end = !self.filter.fetch_all
                && listing.total > 0
                && ticket.query.page > self.last_page(listing.total);
            if past_end {
                tracing::debug!(
                    page = ticket.query.page,
                    total = listing.total,
                    "Requested page is past the last page"
                );
                self.total = listing.total;
                self.known_total = Some(listing.total);
                return Settled::PastLastPage;
            }
        }

        self.loading = false;
        match outcome {
            Ok(listing) => {
                self.items = listing.items;
                self.total = listing.total;
                self.known_total = Some(listing.total);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Listing fetch failed, showing empty results");
                self.items.clear();
                self.total = 0;
            }
        }
        self.page = self.pagination().page;
        Settled::Applied
    }

    pub fn pagination(&self) -> Pagination {
        if self.filter.fetch_all {
            Pagination::new(1, FETCH_ALL_LIMIT, self.total)
        } else {
            Pagination::new(self.page, self.limit, self.total)
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            filter: self.filter.clone(),
            items: self.items.clone(),
            pagination: self.pagination(),
        }
    }
}

/// Longest gap between idle sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// What the caller does with a settled fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    Ready(FeedSnapshot),
    /// Overtaken by a newer request, or the session has gone away.
    Superseded,
    /// The page was past the end; fetch this clamped page instead.
    Refetch(FetchTicket),
}

#[derive(Debug)]
struct TrackedFeed {
    feed: ResultFeed,
    touched: Instant,
}

/// One [`ResultFeed`] per browser session.
///
/// Feeds untouched for longer than `idle` are swept on a later `begin`, so
/// sessions that expire without logging out do not pin their feed.
#[derive(Debug)]
pub struct SearchFeeds {
    feeds: DashMap<String, TrackedFeed>,
    limit: u32,
    idle: Duration,
    next_sweep: Mutex<Instant>,
}

impl SearchFeeds {
    pub fn new(limit: u32, idle: Duration) -> Self {
        Self {
            feeds: DashMap::new(),
            limit,
            idle,
            next_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Run `issue` against the session's feed, creating it on first use.
    pub fn begin(
        &self,
        session_key: &str,
        issue: impl FnOnce(&mut ResultFeed) -> FetchTicket,
    ) -> FetchTicket {
        let now = Instant::now();
        self.sweep(now);
        let mut tracked = self
            .feeds
            .entry(session_key.to_string())
            .or_insert_with(|| TrackedFeed {
                feed: ResultFeed::new(self.limit),
                touched: now,
            });
        tracked.touched = now;
        issue(&mut tracked.feed)
    }

    /// Settle the session's feed.
    pub fn settle(
        &self,
        session_key: &str,
        ticket: &FetchTicket,
        outcome: Result<Listing, ApiError>,
    ) -> FeedUpdate {
        let Some(mut tracked) = self.feeds.get_mut(session_key) else {
            return FeedUpdate::Superseded;
        };
        tracked.touched = Instant::now();
        let feed = &mut tracked.feed;
        match feed.settle(ticket, outcome) {
            Settled::Applied => FeedUpdate::Ready(feed.snapshot()),
            Settled::Stale => FeedUpdate::Superseded,
            Settled::PastLastPage => {
                let page = feed.page();
                FeedUpdate::Refetch(feed.goto_page(page))
            }
        }
    }

    /// Drop feeds idle for longer than the window. Runs at most once per
    /// interval; a concurrent caller skips it.
    fn sweep(&self, now: Instant) {
        let Ok(mut next_sweep) = self.next_sweep.try_lock() else {
            return;
        };
        if now < *next_sweep {
            return;
        }
        *next_sweep = now + SWEEP_INTERVAL.min(self.idle);
        drop(next_sweep);

        let before = self.feeds.len();
        self.feeds
            .retain(|_, tracked| now.duration_since(tracked.touched) < self.idle);
        let evicted = before.saturating_sub(self.feeds.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle search feeds");
        }
    }

    pub fn remove(&self, session_key: &str) {
        self.feeds.remove(session_key);
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}
