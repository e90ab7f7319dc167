use anyhow::{Context, Result, anyhow, ensure};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    condition::keyword_icon,
    model::{WeatherQuery, WeatherReport, round_half_up},
    provider::get_json,
};

use super::{ProviderId, WeatherProvider};

const BASE_URL: &str = "https://wttr.in";

// Anything outside this is not a surface air temperature.
const MAX_ABS_TEMP_F: f64 = 1000.0;

/// wttr.in JSON (`format=j1`) output. Numbers arrive as strings.
#[derive(Debug, Clone)]
pub struct WttrProvider {
    http: Client,
    base_url: String,
}

impl WttrProvider {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    fn url_for(&self, query: &WeatherQuery) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid wttr.in base URL '{}'", self.base_url))?;

        url.path_segments_mut()
            .map_err(|_| anyhow!("wttr.in base URL cannot carry a path"))?
            .pop_if_empty()
            .push(query.as_str());
        url.query_pairs_mut().append_pair("format", "j1");

        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct WtValue {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WtCurrentCondition {
    #[serde(rename = "temp_F")]
    temp_f: String,
    humidity: String,
    weather_desc: Vec<WtValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WtArea {
    area_name: Vec<WtValue>,
    country: Vec<WtValue>,
}

#[derive(Debug, Deserialize)]
struct WtResponse {
    current_condition: Vec<WtCurrentCondition>,
    nearest_area: Vec<WtArea>,
}

fn first<'a>(values: &'a [WtValue], field: &str) -> Result<&'a str> {
    values
        .first()
        .map(|v| v.value.as_str())
        .ok_or_else(|| anyhow!("wttr.in response is missing {field}"))
}

impl TryFrom<WtResponse> for WeatherReport {
    type Error = anyhow::Error;

    fn try_from(parsed: WtResponse) -> Result<Self> {
        let current = parsed
            .current_condition
            .first()
            .ok_or_else(|| anyhow!("wttr.in response contained no current_condition"))?;
        let area = parsed
            .nearest_area
            .first()
            .ok_or_else(|| anyhow!("wttr.in response contained no nearest_area"))?;

        let temp: f64 = current
            .temp_f
            .trim()
            .parse()
            .with_context(|| format!("wttr.in temp_F '{}' is not a number", current.temp_f))?;
        ensure!(
            temp.is_finite() && temp.abs() < MAX_ABS_TEMP_F,
            "wttr.in temp_F '{}' is not a plausible temperature",
            current.temp_f
        );
        let humidity: u8 = current
            .humidity
            .trim()
            .parse()
            .with_context(|| format!("wttr.in humidity '{}' is not a percentage", current.humidity))?;
        ensure!(humidity <= 100, "wttr.in humidity '{}' is above 100%", current.humidity);

        let condition_text = first(&current.weather_desc, "weatherDesc")?.trim().to_lowercase();
        let icon_key = keyword_icon(&condition_text);

        Ok(WeatherReport {
            provider: ProviderId::Wttr,
            location_label: format!(
                "{}, {}",
                first(&area.area_name, "areaName")?,
                first(&area.country, "country")?
            ),
            temperature_f: round_half_up(temp),
            humidity_percent: humidity,
            condition_text,
            icon_key,
        })
    }
}

#[async_trait]
impl WeatherProvider for WttrProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Wttr
    }

    async fn fetch(&self, query: &WeatherQuery) -> Result<WeatherReport> {
        let request = self.http.get(self.url_for(query)?);
        let parsed: WtResponse = get_json(request, "wttr.in").await?;
        parsed.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IconKey;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(s: &str) -> WeatherQuery {
        WeatherQuery::new(s).expect("valid query")
    }

    fn body(temp: &str, humidity: &str, desc: &str) -> serde_json::Value {
        serde_json::json!({
            "current_condition": [{
                "temp_F": temp,
                "temp_C": "0",
                "humidity": humidity,
                "weatherDesc": [{ "value": desc }]
            }],
            "nearest_area": [{
                "areaName": [{ "value": "Tokyo" }],
                "country": [{ "value": "Japan" }]
            }]
        })
    }

    #[test]
    fn city_is_path_segment_and_escaped() {
        let provider = WttrProvider::new(Client::new());
        let url = provider.url_for(&query("San Francisco")).expect("url");
        assert_eq!(url.as_str(), "https://wttr.in/San%20Francisco?format=j1");
    }

    #[tokio::test]
    async fn normalizes_string_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Tokyo"))
            .and(query_param("format", "j1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(body("77", "61", "Partly cloudy")),
            )
            .mount(&mock_server)
            .await;

        let provider = WttrProvider::with_base_url(Client::new(), mock_server.uri());
        let report = provider.fetch(&query("Tokyo")).await.expect("report");

        assert_eq!(report.provider, ProviderId::Wttr);
        assert_eq!(report.location_label, "Tokyo, Japan");
        assert_eq!(report.temperature_f, 77);
        assert_eq!(report.humidity_percent, 61);
        assert_eq!(report.condition_text, "partly cloudy");
        assert_eq!(report.icon_key, IconKey::ScatteredCloudsDay);
    }

    #[tokio::test]
    async fn non_numeric_temperature_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Tokyo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("n/a", "61", "Sunny")))
            .mount(&mock_server)
            .await;

        let provider = WttrProvider::with_base_url(Client::new(), mock_server.uri());
        let err = provider.fetch(&query("Tokyo")).await.unwrap_err();

        assert!(err.to_string().contains("temp_F"));
    }

    #[tokio::test]
    async fn non_finite_temperature_fails() {
        let mock_server = MockServer::start().await;
        let provider = WttrProvider::with_base_url(Client::new(), mock_server.uri());

        for temp in ["NaN", "inf", "-infinity", "1e40"] {
            mock_server.reset().await;
            Mock::given(method("GET"))
                .and(path("/Tokyo"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body(temp, "61", "Sunny")))
                .mount(&mock_server)
                .await;

            let err = provider.fetch(&query("Tokyo")).await.unwrap_err();
            assert!(err.to_string().contains("temp_F"), "{temp}: {err:#}");
        }
    }

    #[tokio::test]
    async fn humidity_above_hundred_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Tokyo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body("77", "250", "Sunny")))
            .mount(&mock_server)
            .await;

        let provider = WttrProvider::with_base_url(Client::new(), mock_server.uri());
        let err = provider.fetch(&query("Tokyo")).await.unwrap_err();

        assert!(err.to_string().contains("above 100%"));
    }

    #[tokio::test]
    async fn empty_condition_list_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Tokyo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current_condition": [],
                "nearest_area": []
            })))
            .mount(&mock_server)
            .await;

        let provider = WttrProvider::with_base_url(Client::new(), mock_server.uri());
        let err = provider.fetch(&query("Tokyo")).await.unwrap_err();

        assert!(err.to_string().contains("no current_condition"));
    }
}
