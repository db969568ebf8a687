use serde::{Deserialize, Serialize};

/// Queries shorter than this (in characters) never reach the search endpoint.
pub const MIN_QUERY_CHARS: usize = 3;

/// Raw text typed into the search box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the query is long enough to be worth a lookup.
    pub fn is_searchable(&self) -> bool {
        self.0.chars().count() >= MIN_QUERY_CHARS
    }
}

impl From<&str> for SearchQuery {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One match returned by the location search endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationCandidate {
    pub id: Option<i64>,
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub url: Option<String>,
}

impl LocationCandidate {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self { name: name.into(), country: country.into(), ..Self::default() }
    }

    /// Row text shown in the candidate list, e.g. "London, UK".
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

/// Current conditions plus the multi-day forecast for a single location.
///
/// Every field tolerates being absent in the payload; a partial response
/// degrades what gets displayed instead of failing the whole load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSnapshot {
    pub location: SnapshotLocation,
    pub current: CurrentConditions,
    pub forecast: Forecast,
}

impl WeatherSnapshot {
    pub fn days(&self) -> &[DayForecast] {
        &self.forecast.forecastday
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotLocation {
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub localtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub text: Option<String>,
    pub icon: Option<String>,
    pub code: Option<u32>,
}

impl Condition {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentConditions {
    pub temp_c: Option<f64>,
    pub feelslike_c: Option<f64>,
    pub humidity: Option<u8>,
    pub wind_kph: Option<f64>,
    pub condition: Condition,
    pub last_updated_epoch: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Forecast {
    pub forecastday: Vec<DayForecast>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DayForecast {
    pub date: String,
    pub day: DaySummary,
    pub astro: Astro,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySummary {
    pub avgtemp_c: Option<f64>,
    pub maxtemp_c: Option<f64>,
    pub mintemp_c: Option<f64>,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Astro {
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}
