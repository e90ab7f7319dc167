use serde::{Deserialize, Serialize};

use crate::{error::WeatherError, provider::ProviderId};

/// A trimmed, non-empty place name as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    text: String,
}

impl WeatherQuery {
    /// Trim `input` and reject it if nothing is left.
    pub fn new(input: &str) -> Result<Self, WeatherError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }
        Ok(Self { text: text.to_string() })
    }

    /// The trimmed query in its original casing; this is what providers receive.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Key under which reports for this query are cached.
    pub fn cache_key(&self) -> String {
        self.text.to_lowercase()
    }
}

impl std::fmt::Display for WeatherQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Display glyph selector: time of day plus condition category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKey {
    ClearDay,
    ClearNight,
    PartlyCloudyDay,
    ScatteredCloudsDay,
    ScatteredCloudsNight,
    Overcast,
    Mist,
    Shower,
    RainDay,
    RainNight,
    ThunderstormDay,
    ThunderstormNight,
    SnowDay,
    SnowNight,
}

impl IconKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconKey::ClearDay => "clear-day",
            IconKey::ClearNight => "clear-night",
            IconKey::PartlyCloudyDay => "partly-cloudy-day",
            IconKey::ScatteredCloudsDay => "scattered-clouds-day",
            IconKey::ScatteredCloudsNight => "scattered-clouds-night",
            IconKey::Overcast => "overcast",
            IconKey::Mist => "mist",
            IconKey::Shower => "shower",
            IconKey::RainDay => "rain-day",
            IconKey::RainNight => "rain-night",
            IconKey::ThunderstormDay => "thunderstorm-day",
            IconKey::ThunderstormNight => "thunderstorm-night",
            IconKey::SnowDay => "snow-day",
            IconKey::SnowNight => "snow-night",
        }
    }
}

impl std::fmt::Display for IconKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized current conditions, identical in shape whichever provider won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub provider: ProviderId,
    pub location_label: String,
    pub temperature_f: i32,
    pub humidity_percent: u8,
    pub condition_text: String,
    pub icon_key: IconKey,
}

/// Round half up, matching how the providers' own widgets display values.
pub(crate) fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
