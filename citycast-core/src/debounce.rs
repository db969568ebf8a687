//! Coalesces rapid search-box edits into a single delayed lookup.
//!
//! The debouncer holds no task of its own. The caller owns the timer:
//! it asks for [`Debouncer::deadline`], sleeps until then, and calls
//! [`Debouncer::fire`]. A new input replaces the pending timer, so at most
//! one is ever outstanding.

use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::SearchQuery;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone)]
struct PendingTimer {
    deadline: Instant,
    query: SearchQuery,
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<PendingTimer>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Record a new input, discarding whatever timer was pending.
    pub fn input(&mut self, text: impl Into<String>, now: Instant) {
        let query = SearchQuery::new(text);
        trace!(query = %query, "debounce timer reset");
        self.pending = Some(PendingTimer { deadline: now + self.delay, query });
    }

    /// Expiry instant of the pending timer, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Consume the timer if it has expired.
    ///
    /// Returns the latest query only when it is long enough to search; a short
    /// query still uses up the timer.
    pub fn fire(&mut self, now: Instant) -> Option<SearchQuery> {
        match &self.pending {
            Some(p) if p.deadline <= now => {}
            _ => return None,
        }

        let expired = self.pending.take()?;
        if expired.query.is_searchable() {
            Some(expired.query)
        } else {
            trace!(query = %expired.query, "debounce expired on a short query");
            None
        }
    }
}
