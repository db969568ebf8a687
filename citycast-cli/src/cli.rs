use std::sync::Arc;

use anyhow::{Context, Result};
use citycast_core::{
    Config, Debouncer, ForecastSource, LocationSearch, ScreenState, ScreenView, SearchQuery,
    Session, SessionHandle, UiEvent, model::MIN_QUERY_CHARS, provider::client_from_config,
    view::WeatherView,
};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Select, Text};
use tracing::debug;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycast", version, about = "Search a city and show its weather forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com key (and optionally a custom base URL).
    Configure,

    /// List locations matching a name fragment.
    Search {
        /// At least three characters of a city name.
        fragment: String,
    },

    /// Show current weather and the daily forecast for a city.
    Show {
        city: String,

        /// Number of forecast days; defaults to the configured value.
        #[arg(long)]
        days: Option<u8>,
    },

    /// Interactive search: type a city, pick a match, see its forecast.
    Browse,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure().await,
            Command::Search { fragment } => search(fragment).await,
            Command::Show { city, days } => show(city, days).await,
            Command::Browse => browse().await,
        }
    }
}

async fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = prompt(|| {
        Password::new("WeatherAPI.com key:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
    })
    .await?;

    let Some(api_key) = api_key else {
        println!("Configuration cancelled.");
        return Ok(());
    };
    config.set_api_key(api_key.trim().to_string());

    let current_base = config.base_url().to_string();
    let base_url = prompt(move || {
        Text::new("API base URL:").with_default(&current_base).prompt()
    })
    .await?;

    if let Some(base_url) = base_url {
        config.base_url = Some(base_url.trim().to_string());
    }

    let path = config.save()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn search(fragment: String) -> Result<()> {
    let query = SearchQuery::new(fragment.trim());
    if !query.is_searchable() {
        anyhow::bail!("Search text must be at least {MIN_QUERY_CHARS} characters long.");
    }

    let config = Config::load()?;
    let client = client_from_config(&config)?;

    let candidates = client
        .search_locations(&query)
        .await
        .with_context(|| format!("Location search for '{query}' failed"))?;

    if candidates.is_empty() {
        println!("No locations match '{query}'.");
    }
    for candidate in candidates {
        println!("{}  ({}, {:.2}, {:.2})", candidate.label(), candidate.region, candidate.lat, candidate.lon);
    }

    Ok(())
}

async fn show(city: String, days: Option<u8>) -> Result<()> {
    let config = Config::load()?;
    let client = client_from_config(&config)?;
    let days = days.unwrap_or(config.forecast_days).max(1);

    let snapshot = client
        .fetch_forecast(city.trim(), days)
        .await
        .with_context(|| format!("Forecast for '{city}' failed"))?;

    print!("{}", render::weather(&WeatherView::from_snapshot(&snapshot)));
    Ok(())
}

async fn browse() -> Result<()> {
    let config = Config::load()?;
    let client = Arc::new(client_from_config(&config)?);

    let handle = Session::new(client.clone(), client)
        .with_debouncer(Debouncer::new(config.debounce()))
        .with_state(ScreenState::new(config.stale_policy, config.forecast_days))
        .spawn();

    let outcome = browse_loop(&handle).await;
    handle.shutdown().await?;
    outcome
}

async fn browse_loop(handle: &SessionHandle) -> Result<()> {
    loop {
        if !handle.state().search_open {
            handle.send(UiEvent::ToggleSearch).await?;
        }

        let text = prompt(|| {
            Text::new("Search City:")
                .with_help_message("empty input or Esc to quit")
                .prompt()
        })
        .await?;

        let Some(text) = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) else {
            return Ok(());
        };

        let query = SearchQuery::new(text);
        if !query.is_searchable() {
            println!("Type at least {MIN_QUERY_CHARS} characters.");
            continue;
        }

        let issued = handle.state().search_seq();
        handle.send(UiEvent::TextChanged(query.to_string())).await?;
        let state = handle.wait_for(|s| s.answered_search_seq() > issued).await?;

        let view = ScreenView::from_state(&state);
        if view.candidate_rows.is_empty() {
            match view.notice {
                Some(notice) => println!("Search failed: {notice}"),
                None => println!("No locations match '{query}'."),
            }
            continue;
        }

        let rows = view.candidate_rows;
        let picked = prompt(move || Select::new("Pick a location:", rows).raw_prompt()).await?;
        let Some(picked) = picked else {
            continue;
        };

        let target = state.forecast_seq() + 1;
        debug!(index = picked.index, "location selected");
        handle.send(UiEvent::Select(picked.index)).await?;

        let state = handle
            .wait_for(|s| s.forecast_seq() >= target && (!s.loading || s.notice.is_some()))
            .await?;

        println!();
        print!("{}", render::screen(&ScreenView::from_state(&state)));
        println!();
    }
}

/// Run a blocking inquire prompt off the async workers; `None` when the user
/// cancels with Esc or Ctrl-C.
async fn prompt<T, F>(ask: F) -> Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> inquire::error::InquireResult<T> + Send + 'static,
{
    let answer = tokio::task::spawn_blocking(ask).await.context("prompt task panicked")?;

    match answer {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e).context("Failed to read input"),
    }
}
