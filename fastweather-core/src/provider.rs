use crate::{
    Config, WeatherQuery, WeatherReport,
    config::HttpSettings,
    provider::{open_meteo::OpenMeteoProvider, weatherapi::WeatherApiProvider, wttr::WttrProvider},
};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod open_meteo;
pub mod weatherapi;
pub mod wttr;

const USER_AGENT: &str = concat!("fastweather/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "weatherapi")]
    WeatherApi,
    #[serde(rename = "open-meteo")]
    OpenMeteo,
    #[serde(rename = "wttr")]
    Wttr,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::WeatherApi => "weatherapi",
            ProviderId::OpenMeteo => "open-meteo",
            ProviderId::Wttr => "wttr",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::WeatherApi, ProviderId::OpenMeteo, ProviderId::Wttr]
    }

    /// Whether the provider refuses requests without a configured API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::WeatherApi)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "weatherapi" => Ok(ProviderId::WeatherApi),
            "open-meteo" | "openmeteo" => Ok(ProviderId::OpenMeteo),
            "wttr" | "wttr.in" => Ok(ProviderId::Wttr),
            _ => Err(anyhow!(
                "Unknown provider '{value}'. Supported providers: weatherapi, open-meteo, wttr."
            )),
        }
    }
}

/// One upstream weather source, normalizing its own response shape.
///
/// An `Err` means this provider could not produce a complete report; the
/// orchestrator logs it and keeps waiting on the others.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn fetch(&self, query: &WeatherQuery) -> anyhow::Result<WeatherReport>;
}

/// Shared HTTP client for all providers.
pub fn build_http_client(settings: &HttpSettings) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Construct a single provider from config.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
    http: Client,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::WeatherApi => {
            let api_key = config.provider_api_key(id).ok_or_else(|| {
                anyhow!(
                    "No API key configured for provider '{id}'.\n\
                     Hint: run `fastweather configure {id}` and enter your API key."
                )
            })?;
            Box::new(WeatherApiProvider::new(api_key.to_owned(), http))
        }
        ProviderId::OpenMeteo => Box::new(OpenMeteoProvider::new(http)),
        ProviderId::Wttr => Box::new(WttrProvider::new(http)),
    };

    Ok(boxed)
}

/// Every provider that can run with the current config. Providers that
/// cannot be constructed (e.g. missing API key) are skipped with a warning.
pub fn providers_from_config(
    config: &Config,
    http: &Client,
) -> Vec<Box<dyn WeatherProvider>> {
    ProviderId::all()
        .iter()
        .filter_map(|&id| match provider_from_config(id, config, http.clone()) {
            Ok(p) => Some(p),
            Err(err) => {
                tracing::warn!(provider = %id, "provider left out of the race: {err:#}");
                None
            }
        })
        .collect()
}

/// Issue a prepared GET and decode the JSON body, with `what` naming the
/// call in error messages.
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    what: &str,
) -> anyhow::Result<T> {
    let res = request
        .send()
        .await
        .with_context(|| format!("Failed to send request to {what}"))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .with_context(|| format!("Failed to read {what} response body"))?;

    if !status.is_success() {
        return Err(anyhow!(
            "{what} request failed with status {}: {}",
            status,
            truncate_body(&body),
        ));
    }

    serde_json::from_str(&body).with_context(|| format!("Failed to parse {what} JSON"))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
