use crate::{
    Config, FetchError, LocationCandidate, SearchQuery, WeatherSnapshot,
    provider::weatherapi::WeatherApiClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod weatherapi;

/// Number of days requested from the forecast endpoint.
pub const FORECAST_DAYS: u8 = 7;

/// Free-text city lookup.
#[async_trait]
pub trait LocationSearch: Send + Sync + Debug {
    async fn search_locations(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<LocationCandidate>, FetchError>;
}

/// Current conditions and multi-day forecast for a resolved city name.
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    async fn fetch_forecast(&self, city: &str, days: u8) -> Result<WeatherSnapshot, FetchError>;
}

/// Construct the WeatherAPI.com client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<WeatherApiClient> {
    let api_key = config.require_api_key()?;
    Ok(WeatherApiClient::new(api_key.to_owned(), config.base_url().to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = client_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn client_from_config_uses_configured_base_url() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());
        cfg.base_url = Some("http://localhost:9999/v1/".to_string());

        let client = client_from_config(&cfg).expect("api key is set");
        assert_eq!(client.endpoint_url("search.json"), "http://localhost:9999/v1/search.json");
    }
}
