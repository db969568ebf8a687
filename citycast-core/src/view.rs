//! Display text derived from [`ScreenState`].

use chrono::NaiveDate;
use serde::Serialize;

use crate::{DayForecast, ScreenState, WeatherIcon, WeatherSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenView {
    pub search_open: bool,
    pub candidate_rows: Vec<String>,
    pub loading: bool,
    pub notice: Option<String>,
    pub weather: Option<WeatherView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
    pub location: String,
    pub icon: WeatherIcon,
    pub temperature: String,
    pub condition: String,
    pub wind: String,
    pub humidity: String,
    pub sunrise: String,
    pub days: Vec<DayView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    pub weekday: String,
    pub icon: WeatherIcon,
    pub temperature: String,
}

impl ScreenView {
    pub fn from_state(state: &ScreenState) -> Self {
        let candidate_rows = if state.search_open {
            state.candidates.iter().map(|c| c.label()).collect()
        } else {
            Vec::new()
        };

        Self {
            search_open: state.search_open,
            candidate_rows,
            loading: state.loading,
            notice: state.notice.clone(),
            weather: state.snapshot.as_ref().map(WeatherView::from_snapshot),
        }
    }
}

impl WeatherView {
    pub fn from_snapshot(snap: &WeatherSnapshot) -> Self {
        let current = &snap.current;

        Self {
            location: format!("{}, {}", snap.location.name, snap.location.country),
            icon: WeatherIcon::for_condition(current.condition.text()),
            temperature: degrees(current.temp_c),
            condition: current.condition.text().unwrap_or_default().to_string(),
            wind: current.wind_kph.map(|w| format!("{}km", number(w))).unwrap_or_default(),
            humidity: current.humidity.map(|h| format!("{h}%")).unwrap_or_default(),
            sunrise: snap
                .days()
                .first()
                .and_then(|d| d.astro.sunrise.clone())
                .unwrap_or_default(),
            days: snap.days().iter().map(DayView::from_day).collect(),
        }
    }
}

impl DayView {
    fn from_day(day: &DayForecast) -> Self {
        Self {
            weekday: weekday(&day.date),
            icon: WeatherIcon::for_condition(day.day.condition.text()),
            temperature: degrees(day.day.avgtemp_c),
        }
    }
}

fn degrees(value: Option<f64>) -> String {
    value.map(|v| format!("{}°", number(v))).unwrap_or_default()
}

/// Whole values print without a decimal point: 18.0 -> "18", 18.5 -> "18.5".
fn number(value: f64) -> String {
    if value.fract() == 0.0 { format!("{value:.0}") } else { value.to_string() }
}

/// Full weekday name for an ISO date; unparsable dates are shown as given.
fn weekday(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%A").to_string())
        .unwrap_or_else(|_| date.to_string())
}
