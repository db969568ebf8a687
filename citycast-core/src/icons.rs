use serde::Serialize;

/// Local icon asset shown for a weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherIcon {
    PartlyCloudy,
    ModerateRain,
    Sun,
    Cloud,
    HeavyRain,
    Mist,
    Other,
}

const CONDITIONS: &[(&str, WeatherIcon)] = &[
    ("partly cloudy", WeatherIcon::PartlyCloudy),
    ("moderate rain", WeatherIcon::ModerateRain),
    ("patchy rain possible", WeatherIcon::ModerateRain),
    ("patchy rain nearby", WeatherIcon::ModerateRain),
    ("light rain", WeatherIcon::ModerateRain),
    ("moderate rain at times", WeatherIcon::ModerateRain),
    ("sunny", WeatherIcon::Sun),
    ("clear", WeatherIcon::Sun),
    ("overcast", WeatherIcon::Cloud),
    ("cloudy", WeatherIcon::Cloud),
    ("heavy rain", WeatherIcon::HeavyRain),
    ("heavy rain at times", WeatherIcon::HeavyRain),
    ("moderate or heavy freezing rain", WeatherIcon::HeavyRain),
    ("moderate or heavy rain shower", WeatherIcon::HeavyRain),
    ("moderate or heavy rain with thunder", WeatherIcon::HeavyRain),
    ("mist", WeatherIcon::Mist),
];

impl WeatherIcon {
    /// Icon for a condition text; unknown or missing text maps to [`WeatherIcon::Other`].
    pub fn for_condition(text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return WeatherIcon::Other;
        };

        CONDITIONS
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(text))
            .map(|(_, icon)| *icon)
            .unwrap_or(WeatherIcon::Other)
    }

    /// Asset key, e.g. "partlycloudy" or "other".
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherIcon::PartlyCloudy => "partlycloudy",
            WeatherIcon::ModerateRain => "moderaterain",
            WeatherIcon::Sun => "sun",
            WeatherIcon::Cloud => "cloud",
            WeatherIcon::HeavyRain => "heavyrain",
            WeatherIcon::Mist => "mist",
            WeatherIcon::Other => "other",
        }
    }
}

impl std::fmt::Display for WeatherIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
