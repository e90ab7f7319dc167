//! Mapping of provider condition data onto description text and [`IconKey`].
//!
//! Two schemes exist: open-meteo reports a numeric WMO weather code, while
//! weatherapi and wttr report free text that is matched by keyword.

use crate::model::IconKey;

/// Description for a WMO weather code. Unlisted codes read as "clear sky".
/// See: https://open-meteo.com/en/docs#weathervariables
pub fn wmo_description(code: i32) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 => "fog",
        48 => "depositing rime fog",
        51 => "light drizzle",
        53 => "moderate drizzle",
        55 => "dense drizzle",
        61 => "slight rain",
        63 => "moderate rain",
        65 => "heavy rain",
        71 => "slight snow",
        73 => "moderate snow",
        75 => "heavy snow",
        95 => "thunderstorm",
        96 => "thunderstorm with hail",
        99 => "thunderstorm with heavy hail",
        _ => "clear sky",
    }
}

/// Icon bucket for a WMO weather code.
pub fn wmo_icon(code: i32) -> IconKey {
    match code {
        0 => IconKey::ClearDay,
        1..=3 => IconKey::PartlyCloudyDay,
        45..=48 => IconKey::Mist,
        51..=55 => IconKey::Shower,
        61..=65 => IconKey::RainDay,
        71..=75 => IconKey::SnowDay,
        95..=99 => IconKey::ThunderstormDay,
        _ => IconKey::ClearDay,
    }
}

// Order matters: the first group with a matching keyword wins.
const KEYWORD_ICONS: &[(&[&str], IconKey)] = &[
    (&["clear", "sunny"], IconKey::ClearDay),
    (&["cloud"], IconKey::ScatteredCloudsDay),
    (&["rain", "drizzle"], IconKey::RainDay),
    (&["thunder"], IconKey::ThunderstormDay),
    (&["snow"], IconKey::SnowDay),
    (&["mist", "fog"], IconKey::Mist),
];

/// Icon for a free-text condition description, case-insensitive.
pub fn keyword_icon(description: &str) -> IconKey {
    let text = description.to_lowercase();

    KEYWORD_ICONS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, icon)| *icon)
        .unwrap_or(IconKey::ClearDay)
}
