use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{FetchError, LocationCandidate, SearchQuery, WeatherSnapshot};

use super::{ForecastSource, LocationSearch};

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

const SEARCH_ENDPOINT: &str = "search.json";
const FORECAST_ENDPOINT: &str = "forecast.json";

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self { api_key, base_url, http: Client::new() }
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = self.endpoint_url(endpoint);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport { endpoint, message: e.to_string() })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| FetchError::Transport { endpoint, message: e.to_string() })?;

        debug!(endpoint, status = status.as_u16(), bytes = body.len(), "weather service responded");

        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        decode(endpoint, &body)
    }
}

#[async_trait]
impl LocationSearch for WeatherApiClient {
    async fn search_locations(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<LocationCandidate>, FetchError> {
        debug!(query = %query, "searching locations");
        self.get_json(SEARCH_ENDPOINT, &[("q", query.as_str())]).await
    }
}

#[async_trait]
impl ForecastSource for WeatherApiClient {
    async fn fetch_forecast(&self, city: &str, days: u8) -> Result<WeatherSnapshot, FetchError> {
        debug!(city, days, "fetching forecast");
        let days = days.to_string();
        self.get_json(
            FORECAST_ENDPOINT,
            &[("q", city), ("days", days.as_str()), ("aqi", "no"), ("alerts", "no")],
        )
        .await
    }
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode { endpoint, message: e.to_string() })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
