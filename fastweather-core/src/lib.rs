//! Core library for the `fastweather` CLI.
//!
//! This crate defines:
//! - Adapters for three weather providers, each normalizing to [`WeatherReport`]
//! - The [`WeatherService`] orchestrator that races them behind a short-lived cache
//! - Configuration & credentials handling
//!
//! It is used by `fastweather-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod condition;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod provider;

pub use cache::{Clock, ReportCache, SystemClock};
pub use config::{CacheSettings, Config, HttpSettings, ProviderConfig};
pub use error::WeatherError;
pub use model::{IconKey, WeatherQuery, WeatherReport};
pub use orchestrator::{WeatherService, WeatherServiceBuilder};
pub use provider::{ProviderId, WeatherProvider};
