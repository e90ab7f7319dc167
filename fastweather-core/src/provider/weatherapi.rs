use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    condition::keyword_icon,
    model::{WeatherQuery, WeatherReport, round_half_up},
    provider::get_json,
};

use super::{ProviderId, WeatherProvider};

const BASE_URL: &str = "https://api.weatherapi.com/v1";

/// WeatherAPI.com current conditions; needs an API key.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    http: Client,
    base_url: String,
}

impl WeatherApiProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self::with_base_url(api_key, http, BASE_URL)
    }

    pub fn with_base_url(api_key: String, http: Client, base_url: impl Into<String>) -> Self {
        Self { api_key, http, base_url: base_url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_f: f64,
    humidity: u8,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

impl From<WaResponse> for WeatherReport {
    fn from(parsed: WaResponse) -> Self {
        let condition_text = parsed.current.condition.text.to_lowercase();
        let icon_key = keyword_icon(&condition_text);

        WeatherReport {
            provider: ProviderId::WeatherApi,
            location_label: format!("{}, {}", parsed.location.name, parsed.location.country),
            temperature_f: round_half_up(parsed.current.temp_f),
            humidity_percent: parsed.current.humidity,
            condition_text,
            icon_key,
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherReport> {
        let request = self
            .http
            .get(format!("{}/current.json", self.base_url))
            .query(&[("key", self.api_key.as_str()), ("q", query.as_str()), ("aqi", "no")]);

        let parsed: WaResponse = get_json(request, "WeatherAPI.com (current)").await?;
        Ok(parsed.into())
    }
}
