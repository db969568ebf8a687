//! View state of the search/forecast screen and its transition function.
//!
//! [`reduce`] is pure: it takes the current state and an [`Action`] and
//! returns the next state together with the requests ([`Effect`]s) the
//! session must issue. All network I/O lives outside this module.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{FetchError, LocationCandidate, SearchQuery, WeatherSnapshot};

/// What to do with a response that belongs to an older request than the
/// latest one issued for the same endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StalePolicy {
    /// Apply responses in arrival order; a late stale response wins.
    LastWriterWins,
    /// Drop responses whose request has been superseded.
    #[default]
    DiscardSuperseded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ToggleSearch,
    /// The debounce timer expired on a searchable query.
    SearchFired(SearchQuery),
    SearchCompleted { seq: u64, result: Result<Vec<LocationCandidate>, FetchError> },
    /// Pick a row from the candidate list by position.
    Select(usize),
    ForecastCompleted { seq: u64, result: Result<WeatherSnapshot, FetchError> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SearchLocations { seq: u64, query: SearchQuery },
    FetchForecast { seq: u64, city: String, days: u8 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenState {
    pub search_open: bool,
    pub candidates: Vec<LocationCandidate>,
    pub loading: bool,
    pub snapshot: Option<WeatherSnapshot>,
    /// Last swallowed request failure, kept for display.
    pub notice: Option<String>,

    pub policy: StalePolicy,
    pub forecast_days: u8,

    search_seq: u64,
    answered_search_seq: u64,
    /// `search_seq` at the last selection; searches up to here lost their panel.
    selected_search_seq: u64,
    forecast_seq: u64,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self::new(StalePolicy::default(), crate::provider::FORECAST_DAYS)
    }
}

impl ScreenState {
    /// Starts idle with `loading` false: nothing is fetched until a city is selected.
    pub fn new(policy: StalePolicy, forecast_days: u8) -> Self {
        Self {
            search_open: false,
            candidates: Vec::new(),
            loading: false,
            snapshot: None,
            notice: None,
            policy,
            forecast_days,
            search_seq: 0,
            answered_search_seq: 0,
            selected_search_seq: 0,
            forecast_seq: 0,
        }
    }

    /// Sequence number of the most recently issued search.
    pub fn search_seq(&self) -> u64 {
        self.search_seq
    }

    /// Sequence number of the latest search whose response was applied,
    /// successful or not.
    pub fn answered_search_seq(&self) -> u64 {
        self.answered_search_seq
    }

    pub fn forecast_seq(&self) -> u64 {
        self.forecast_seq
    }

    fn is_stale(&self, seq: u64, latest: u64) -> bool {
        self.policy == StalePolicy::DiscardSuperseded && seq < latest
    }

    /// A search is also superseded by any selection made after it was issued.
    fn is_stale_search(&self, seq: u64) -> bool {
        self.is_stale(seq, self.search_seq)
            || (self.policy == StalePolicy::DiscardSuperseded && seq <= self.selected_search_seq)
    }
}

/// Compute the next state for `action`.
pub fn reduce(mut state: ScreenState, action: Action) -> (ScreenState, Vec<Effect>) {
    let mut effects = Vec::new();

    match action {
        Action::ToggleSearch => {
            state.search_open = !state.search_open;
        }

        Action::SearchFired(query) => {
            state.search_seq += 1;
            effects.push(Effect::SearchLocations { seq: state.search_seq, query });
        }

        Action::SearchCompleted { seq, result } => {
            if state.is_stale_search(seq) {
                debug!(seq, latest = state.search_seq, "discarding superseded search response");
                return (state, effects);
            }
            state.answered_search_seq = state.answered_search_seq.max(seq);
            match result {
                Ok(candidates) => {
                    debug!(seq, count = candidates.len(), "candidate list replaced");
                    state.candidates = candidates;
                    state.notice = None;
                }
                Err(err) => {
                    warn!(seq, endpoint = err.endpoint(), error = %err, "location search failed");
                    state.notice = Some(err.to_string());
                }
            }
        }

        Action::Select(index) => {
            if !state.search_open {
                debug!(index, "selection ignored while search is closed");
                return (state, effects);
            }
            let Some(candidate) = state.candidates.get(index).cloned() else {
                debug!(index, "selection outside candidate list ignored");
                return (state, effects);
            };

            state.loading = true;
            state.search_open = false;
            state.candidates.clear();
            state.notice = None;
            state.selected_search_seq = state.search_seq;
            state.forecast_seq += 1;

            effects.push(Effect::FetchForecast {
                seq: state.forecast_seq,
                city: candidate.name,
                days: state.forecast_days,
            });
        }

        Action::ForecastCompleted { seq, result } => {
            if state.is_stale(seq, state.forecast_seq) {
                debug!(seq, latest = state.forecast_seq, "discarding superseded forecast response");
                return (state, effects);
            }
            match result {
                Ok(snapshot) => {
                    state.snapshot = Some(snapshot);
                    state.loading = false;
                }
                // TODO: offer a retry once the forecast endpoint gets a timeout; until then the
                // screen stays in its loading state with the previous snapshot.
                Err(err) => {
                    warn!(seq, endpoint = err.endpoint(), error = %err, "forecast fetch failed");
                    state.notice = Some(err.to_string());
                }
            }
        }
    }

    (state, effects)
}
