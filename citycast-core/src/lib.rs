//! Core library for the `citycast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The WeatherAPI.com client behind two request/response traits
//! - The search debouncer and the screen state machine
//! - A session loop that drives the screen from UI events
//! - Mapping from weather data to display text and icon keys
//!
//! It is used by `citycast-cli`, but the session can be driven by any front end.

pub mod config;
pub mod debounce;
pub mod error;
pub mod icons;
pub mod model;
pub mod provider;
pub mod screen;
pub mod session;
pub mod view;

pub use config::Config;
pub use debounce::Debouncer;
pub use error::FetchError;
pub use icons::WeatherIcon;
pub use model::{DayForecast, LocationCandidate, SearchQuery, WeatherSnapshot};
pub use provider::{ForecastSource, LocationSearch, weatherapi::WeatherApiClient};
pub use screen::{ScreenState, StalePolicy};
pub use session::{Session, SessionHandle, UiEvent};
pub use view::ScreenView;
