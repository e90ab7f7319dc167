use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    condition::{wmo_description, wmo_icon},
    model::{WeatherQuery, WeatherReport, round_half_up},
    provider::get_json,
};

use super::{ProviderId, WeatherProvider};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1";

/// Open-Meteo does not return humidity with `current_weather`, so the
/// report carries this fixed value instead.
pub const PLACEHOLDER_HUMIDITY: u8 = 65;

/// Open-Meteo: geocode the query, then fetch current weather at the
/// coordinates of the first match. No API key.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl OpenMeteoProvider {
    pub fn new(http: Client) -> Self {
        Self::with_base_urls(http, GEOCODING_URL, FORECAST_URL)
    }

    pub fn with_base_urls(
        http: Client,
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
    ) -> Self {
        Self { http, geocoding_url: geocoding_url.into(), forecast_url: forecast_url.into() }
    }

    async fn geocode(&self, query: &WeatherQuery) -> Result<GeoPlace> {
        let request = self.http.get(format!("{}/search", self.geocoding_url)).query(&[
            ("name", query.as_str()),
            ("count", "1"),
            ("language", "en"),
            ("format", "json"),
        ]);

        let parsed: GeoResponse = get_json(request, "Open-Meteo geocoding").await?;

        parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Open-Meteo geocoding found no location matching '{query}'"))
    }

    async fn current_weather(&self, place: &GeoPlace) -> Result<OmCurrentWeather> {
        let request = self.http.get(format!("{}/forecast", self.forecast_url)).query(&[
            ("latitude", place.latitude.to_string()),
            ("longitude", place.longitude.to_string()),
            ("current_weather", "true".to_string()),
            ("temperature_unit", "fahrenheit".to_string()),
            ("timezone", "auto".to_string()),
        ]);

        let parsed: OmForecastResponse = get_json(request, "Open-Meteo forecast").await?;
        Ok(parsed.current_weather)
    }
}

#[derive(Debug, Deserialize)]
struct GeoPlace {
    latitude: f64,
    longitude: f64,
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    // absent entirely when nothing matches
    #[serde(default)]
    results: Vec<GeoPlace>,
}

#[derive(Debug, Deserialize)]
struct OmCurrentWeather {
    temperature: f64,
    weathercode: i32,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    current_weather: OmCurrentWeather,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherReport> {
        let place = self.geocode(query).await?;
        tracing::debug!(
            name = %place.name,
            lat = place.latitude,
            lon = place.longitude,
            "open-meteo resolved location"
        );

        let current = self.current_weather(&place).await?;

        Ok(WeatherReport {
            provider: ProviderId::OpenMeteo,
            location_label: format!("{}, {}", place.name, place.country),
            temperature_f: round_half_up(current.temperature),
            humidity_percent: PLACEHOLDER_HUMIDITY,
            condition_text: wmo_description(current.weathercode).to_string(),
            icon_key: wmo_icon(current.weathercode),
        })
    }
}
