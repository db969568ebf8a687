//! Event loop that drives one screen.
//!
//! A single task owns the [`ScreenState`] and the [`Debouncer`]. UI events,
//! the debounce deadline and request completions are all handled on that
//! task, one at a time. Requests themselves run as detached tasks and are
//! never cancelled; they report back over a channel.

use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, info};

use crate::{
    Debouncer, ForecastSource, LocationSearch, ScreenState, StalePolicy,
    screen::{Action, Effect, reduce},
};

const UI_EVENT_BUFFER: usize = 32;

/// Input coming from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    ToggleSearch,
    TextChanged(String),
    Select(usize),
    Shutdown,
}

pub struct Session {
    search: Arc<dyn LocationSearch>,
    forecast: Arc<dyn ForecastSource>,
    debouncer: Debouncer,
    state: ScreenState,
}

impl Session {
    pub fn new(search: Arc<dyn LocationSearch>, forecast: Arc<dyn ForecastSource>) -> Self {
        Self { search, forecast, debouncer: Debouncer::default(), state: ScreenState::default() }
    }

    pub fn with_debouncer(mut self, debouncer: Debouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    pub fn with_state(mut self, state: ScreenState) -> Self {
        self.state = state;
        self
    }

    /// Start the event loop on the current runtime.
    pub fn spawn(self) -> SessionHandle {
        let (events_tx, events_rx) = mpsc::channel(UI_EVENT_BUFFER);
        let (state_tx, state_rx) = watch::channel(self.state.clone());

        let task = tokio::spawn(self.run(events_rx, state_tx));

        SessionHandle { events: events_tx, state: state_rx, task }
    }

    async fn run(
        mut self,
        mut events: mpsc::Receiver<UiEvent>,
        publish: watch::Sender<ScreenState>,
    ) -> ScreenState {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Action>();

        loop {
            let deadline = self.debouncer.deadline();

            tokio::select! {
                event = events.recv() => match event {
                    None | Some(UiEvent::Shutdown) => break,
                    Some(event) => self.handle_event(event, &done_tx),
                },
                Some(action) = done_rx.recv() => self.apply(action, &done_tx),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(query) = self.debouncer.fire(Instant::now()) {
                        self.apply(Action::SearchFired(query), &done_tx);
                    }
                }
            }

            publish.send_replace(self.state.clone());
        }

        info!("screen session stopped");
        self.state
    }

    fn handle_event(&mut self, event: UiEvent, done: &mpsc::UnboundedSender<Action>) {
        match event {
            UiEvent::ToggleSearch => {
                self.apply(Action::ToggleSearch, done);
                self.cancel_timer_if_closed();
            }
            UiEvent::TextChanged(text) if self.state.search_open => {
                self.debouncer.input(text, Instant::now());
            }
            UiEvent::TextChanged(_) => debug!("text change ignored while search is closed"),
            UiEvent::Select(index) => {
                self.apply(Action::Select(index), done);
                self.cancel_timer_if_closed();
            }
            UiEvent::Shutdown => {}
        }
    }

    /// A closed panel drops the pending search, except under last-writer-wins
    /// where the timer keeps running and its search still goes out.
    fn cancel_timer_if_closed(&mut self) {
        if !self.state.search_open && self.state.policy == StalePolicy::DiscardSuperseded {
            self.debouncer.cancel();
        }
    }

    fn apply(&mut self, action: Action, done: &mpsc::UnboundedSender<Action>) {
        let (next, effects) = reduce(std::mem::take(&mut self.state), action);
        self.state = next;

        for effect in effects {
            self.dispatch(effect, done.clone());
        }
    }

    fn dispatch(&self, effect: Effect, done: mpsc::UnboundedSender<Action>) {
        match effect {
            Effect::SearchLocations { seq, query } => {
                debug!(seq, query = %query, "issuing location search");
                let search = Arc::clone(&self.search);
                tokio::spawn(async move {
                    let result = search.search_locations(&query).await;
                    // The receiver is gone only after shutdown.
                    let _ = done.send(Action::SearchCompleted { seq, result });
                });
            }
            Effect::FetchForecast { seq, city, days } => {
                debug!(seq, %city, days, "issuing forecast fetch");
                let forecast = Arc::clone(&self.forecast);
                tokio::spawn(async move {
                    let result = forecast.fetch_forecast(&city, days).await;
                    let _ = done.send(Action::ForecastCompleted { seq, result });
                });
            }
        }
    }
}

/// Client side of a running [`Session`].
pub struct SessionHandle {
    events: mpsc::Sender<UiEvent>,
    state: watch::Receiver<ScreenState>,
    task: JoinHandle<ScreenState>,
}

impl SessionHandle {
    pub async fn send(&self, event: UiEvent) -> Result<()> {
        self.events.send(event).await.map_err(|_| anyhow!("screen session has stopped"))
    }

    /// Latest published state.
    pub fn state(&self) -> ScreenState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScreenState> {
        self.state.clone()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for(&self, predicate: impl FnMut(&ScreenState) -> bool) -> Result<ScreenState> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(predicate)
            .await
            .map_err(|_| anyhow!("screen session stopped while waiting for state"))?;
        Ok(state.clone())
    }

    /// Stop the loop and return the final state.
    pub async fn shutdown(self) -> Result<ScreenState> {
        // Already stopped if this fails; the join below still yields the state.
        let _ = self.events.send(UiEvent::Shutdown).await;
        self.task.await.context("screen session task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchError, LocationCandidate, SearchQuery, ScreenView, WeatherSnapshot};
    use async_trait::async_trait;
    use std::{collections::HashMap, sync::Mutex, time::Duration};
    use tokio::time::sleep;

    #[derive(Debug, Default)]
    struct FakeService {
        searches: Mutex<Vec<String>>,
        forecasts: Mutex<Vec<(String, u8)>>,
        results: HashMap<String, Vec<LocationCandidate>>,
        delays: HashMap<String, Duration>,
        forecast_fails: bool,
    }

    impl FakeService {
        fn with_result(mut self, query: &str, names: &[(&str, &str)]) -> Self {
            let list = names.iter().map(|(n, c)| LocationCandidate::new(*n, *c)).collect();
            self.results.insert(query.to_string(), list);
            self
        }

        fn with_delay(mut self, key: &str, delay: Duration) -> Self {
            self.delays.insert(key.to_string(), delay);
            self
        }

        fn searches(&self) -> Vec<String> {
            self.searches.lock().unwrap().clone()
        }

        async fn pause_for(&self, key: &str) {
            if let Some(delay) = self.delays.get(key) {
                sleep(*delay).await;
            }
        }
    }

    #[async_trait]
    impl LocationSearch for FakeService {
        async fn search_locations(
            &self,
            query: &SearchQuery,
        ) -> Result<Vec<LocationCandidate>, FetchError> {
            self.searches.lock().unwrap().push(query.to_string());
            self.pause_for(query.as_str()).await;
            Ok(self.results.get(query.as_str()).cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl ForecastSource for FakeService {
        async fn fetch_forecast(&self, city: &str, days: u8) -> Result<WeatherSnapshot, FetchError> {
            self.forecasts.lock().unwrap().push((city.to_string(), days));
            self.pause_for(city).await;

            if self.forecast_fails {
                return Err(FetchError::Transport {
                    endpoint: "forecast.json",
                    message: "network unreachable".into(),
                });
            }

            let mut snap = WeatherSnapshot::default();
            snap.location.name = city.to_string();
            snap.current.temp_c = Some(18.0);
            snap.forecast.forecastday = (1..=days)
                .map(|d| crate::DayForecast { date: format!("2024-05-{d:02}"), ..Default::default() })
                .collect();
            Ok(snap)
        }
    }

    fn start(service: FakeService, policy: StalePolicy) -> (Arc<FakeService>, SessionHandle) {
        let service = Arc::new(service);
        let handle = Session::new(service.clone(), service.clone())
            .with_state(ScreenState::new(policy, 7))
            .spawn();
        (service, handle)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn short_input_never_searches() {
        let (service, handle) = start(FakeService::default(), StalePolicy::default());

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        for text in ["L", "Lo", "", "Lo"] {
            handle.send(UiEvent::TextChanged(text.into())).await.unwrap();
            sleep(ms(2000)).await;
        }

        assert!(service.searches().is_empty());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_issues_one_search_with_latest_text() {
        let (service, handle) = start(FakeService::default(), StalePolicy::default());

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        for text in ["Lon", "Lond", "Londo", "London"] {
            handle.send(UiEvent::TextChanged(text.into())).await.unwrap();
            sleep(ms(400)).await;
        }

        // last input at t=1200, timer expires at t=2400
        sleep(ms(700)).await;
        assert!(service.searches().is_empty());

        sleep(ms(200)).await;
        assert_eq!(service.searches(), vec!["London"]);

        sleep(ms(5000)).await;
        assert_eq!(service.searches().len(), 1);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn search_select_and_forecast_end_to_end() {
        let service = FakeService::default().with_result("Lon", &[("London", "UK")]);
        let (service, handle) = start(service, StalePolicy::default());

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        handle.send(UiEvent::TextChanged("Lon".into())).await.unwrap();

        let state = handle.wait_for(|s| !s.candidates.is_empty()).await.unwrap();
        assert_eq!(ScreenView::from_state(&state).candidate_rows, vec!["London, UK"]);

        handle.send(UiEvent::Select(0)).await.unwrap();
        let state = handle.wait_for(|s| s.forecast_seq() == 1).await.unwrap();
        assert!(state.candidates.is_empty());
        assert!(!state.search_open);

        let state = handle.wait_for(|s| !s.loading && s.snapshot.is_some()).await.unwrap();
        let view = ScreenView::from_state(&state);
        let weather = view.weather.expect("snapshot loaded");
        assert_eq!(weather.temperature, "18°");
        assert_eq!(weather.days.len(), 7);
        assert_eq!(*service.forecasts.lock().unwrap(), vec![("London".to_string(), 7)]);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn select_takes_effect_before_forecast_arrives() {
        let service = FakeService::default()
            .with_result("Lon", &[("London", "UK")])
            .with_delay("London", Duration::from_secs(30));
        let (_service, handle) = start(service, StalePolicy::default());

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        handle.send(UiEvent::TextChanged("Lon".into())).await.unwrap();
        handle.wait_for(|s| !s.candidates.is_empty()).await.unwrap();

        handle.send(UiEvent::Select(0)).await.unwrap();
        sleep(ms(10)).await;

        let state = handle.state();
        assert!(state.loading);
        assert!(state.candidates.is_empty());
        assert!(!state.search_open);
        assert!(state.snapshot.is_none());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn empty_result_keeps_search_open() {
        let (_service, handle) = start(FakeService::default(), StalePolicy::default());

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        handle.send(UiEvent::TextChanged("Xyzzy".into())).await.unwrap();

        let state = handle.wait_for(|s| s.answered_search_seq() == 1).await.unwrap();
        let view = ScreenView::from_state(&state);
        assert!(view.search_open);
        assert!(view.candidate_rows.is_empty());

        handle.shutdown().await.unwrap();
    }

    async fn race_slow_then_fast(policy: StalePolicy) -> ScreenState {
        let service = FakeService::default()
            .with_result("Lon", &[("London", "UK")])
            .with_result("Par", &[("Paris", "France")])
            .with_delay("Lon", Duration::from_secs(5));
        let (_service, handle) = start(service, policy);

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        handle.send(UiEvent::TextChanged("Lon".into())).await.unwrap();
        sleep(ms(1300)).await;
        handle.send(UiEvent::TextChanged("Par".into())).await.unwrap();

        // both responses are in by t=6200
        sleep(ms(10_000)).await;
        handle.shutdown().await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_search_response_is_dropped() {
        let state = race_slow_then_fast(StalePolicy::DiscardSuperseded).await;
        assert_eq!(state.candidates, vec![LocationCandidate::new("Paris", "France")]);
    }

    #[tokio::test(start_paused = true)]
    async fn last_writer_wins_lets_stale_response_through() {
        let state = race_slow_then_fast(StalePolicy::LastWriterWins).await;
        assert_eq!(state.candidates, vec![LocationCandidate::new("London", "UK")]);
    }

    #[tokio::test(start_paused = true)]
    async fn forecast_failure_leaves_screen_loading() {
        let service = FakeService { forecast_fails: true, ..Default::default() }
            .with_result("Lon", &[("London", "UK")]);
        let (_service, handle) = start(service, StalePolicy::default());

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        handle.send(UiEvent::TextChanged("Lon".into())).await.unwrap();
        handle.wait_for(|s| !s.candidates.is_empty()).await.unwrap();
        handle.send(UiEvent::Select(0)).await.unwrap();

        let state = handle.wait_for(|s| s.notice.is_some()).await.unwrap();
        assert!(state.loading);
        assert!(state.snapshot.is_none());
        assert!(state.notice.unwrap().contains("network unreachable"));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn closing_search_cancels_pending_timer() {
        let (service, handle) = start(FakeService::default(), StalePolicy::default());

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        handle.send(UiEvent::TextChanged("Rome".into())).await.unwrap();
        sleep(ms(500)).await;
        handle.send(UiEvent::ToggleSearch).await.unwrap();
        sleep(ms(5000)).await;

        assert!(service.searches().is_empty());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn typing_while_closed_is_ignored() {
        let (service, handle) = start(FakeService::default(), StalePolicy::default());

        handle.send(UiEvent::TextChanged("Rome".into())).await.unwrap();
        sleep(ms(5000)).await;

        assert!(service.searches().is_empty());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn search_landing_after_select_cannot_start_second_forecast() {
        let service = FakeService::default()
            .with_result("Lon", &[("London", "UK")])
            .with_result("Lond", &[("Londrina", "Brazil")])
            .with_delay("Lond", Duration::from_secs(5))
            .with_delay("London", Duration::from_secs(30));
        let (service, handle) = start(service, StalePolicy::DiscardSuperseded);

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        handle.send(UiEvent::TextChanged("Lon".into())).await.unwrap();
        handle.wait_for(|s| !s.candidates.is_empty()).await.unwrap();

        // "Lond" fires at t=2400 and answers at t=7400, after the selection
        handle.send(UiEvent::TextChanged("Lond".into())).await.unwrap();
        sleep(ms(1300)).await;
        handle.send(UiEvent::Select(0)).await.unwrap();
        sleep(ms(6000)).await;

        let state = handle.state();
        assert!(state.loading);
        assert!(state.candidates.is_empty());
        assert!(!state.search_open);

        handle.send(UiEvent::Select(0)).await.unwrap();
        sleep(ms(10)).await;
        assert_eq!(*service.forecasts.lock().unwrap(), vec![("London".to_string(), 7)]);
        assert_eq!(handle.state().forecast_seq(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn last_writer_wins_keeps_timer_after_closing_search() {
        let (service, handle) = start(FakeService::default(), StalePolicy::LastWriterWins);

        handle.send(UiEvent::ToggleSearch).await.unwrap();
        handle.send(UiEvent::TextChanged("Rome".into())).await.unwrap();
        sleep(ms(500)).await;
        handle.send(UiEvent::ToggleSearch).await.unwrap();
        sleep(ms(5000)).await;

        assert_eq!(service.searches(), vec!["Rome"]);
        handle.shutdown().await.unwrap();
    }
}
