//! Rendering of reports for the terminal.

use fastweather_core::{IconKey, WeatherReport};

/// Message shown for any failed lookup; provider detail goes to the log only.
pub const FETCH_FAILED_MESSAGE: &str = "Unable to fetch weather data. Please try again.";

pub fn icon_glyph(icon: IconKey) -> &'static str {
    match icon {
        IconKey::ClearDay => "☀️",
        IconKey::ClearNight => "🌙",
        IconKey::PartlyCloudyDay => "⛅",
        IconKey::ScatteredCloudsDay | IconKey::ScatteredCloudsNight => "☁️",
        IconKey::Overcast => "☁️",
        IconKey::Mist => "🌫️",
        IconKey::Shower => "🌦️",
        IconKey::RainDay | IconKey::RainNight => "🌧️",
        IconKey::ThunderstormDay | IconKey::ThunderstormNight => "⛈️",
        IconKey::SnowDay | IconKey::SnowNight => "❄️",
    }
}

/// Capitalize the first letter of each word, e.g. "light rain" -> "Light Rain".
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render(report: &WeatherReport) -> String {
    format!(
        "{glyph}  {location}\n   Temperature: {temp}°F\n   Humidity:    {humidity}%\n   Conditions:  {condition}\n   (via {provider})",
        glyph = icon_glyph(report.icon_key),
        location = report.location_label,
        temp = report.temperature_f,
        humidity = report.humidity_percent,
        condition = title_case(&report.condition_text),
        provider = report.provider,
    )
}
