//! Cache-fronted race across all configured providers.

use futures::future::{BoxFuture, FutureExt, select_ok};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    Config, WeatherError, WeatherQuery, WeatherReport,
    cache::{Clock, ReportCache, SystemClock},
    config::CacheSettings,
    provider::{WeatherProvider, build_http_client, providers_from_config},
};

/// Entry point for callers: one query in, one normalized report or one
/// unified error out.
#[derive(Debug)]
pub struct WeatherService {
    providers: Vec<Box<dyn WeatherProvider>>,
    cache: ReportCache,
    clock: Arc<dyn Clock>,
}

impl WeatherService {
    pub fn builder() -> WeatherServiceBuilder {
        WeatherServiceBuilder::default()
    }

    /// Service with every provider the config allows, real clock, configured cache.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(WeatherServiceBuilder::from_config(config)?.build())
    }

    pub fn providers(&self) -> impl Iterator<Item = &dyn WeatherProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    /// Cached report if still fresh, otherwise the first provider to succeed.
    ///
    /// Once a provider wins, the others' in-flight requests are dropped.
    /// A failed race leaves the cache untouched.
    pub async fn get_weather(&self, query: &WeatherQuery) -> Result<WeatherReport, WeatherError> {
        let key = query.cache_key();

        if let Some(report) = self.cache.get(&key, self.clock.now()) {
            debug!(%key, provider = %report.provider, "cache hit");
            return Ok(report);
        }
        debug!(%key, "cache miss, racing {} providers", self.providers.len());

        if self.providers.is_empty() {
            warn!("no weather providers configured");
            return Err(WeatherError::AllSourcesFailed);
        }

        let racers: Vec<BoxFuture<'_, anyhow::Result<WeatherReport>>> = self
            .providers
            .iter()
            .map(|provider| {
                async move {
                    provider.fetch(query).await.inspect_err(|err| {
                        warn!(provider = %provider.id(), query = %query, "provider failed: {err:#}");
                    })
                }
                .boxed()
            })
            .collect();

        let report = match select_ok(racers).await {
            Ok((report, _losers)) => report,
            Err(_) => {
                warn!(query = %query, "all weather providers failed");
                return Err(WeatherError::AllSourcesFailed);
            }
        };

        info!(provider = %report.provider, location = %report.location_label, "weather fetched");
        self.cache.insert(key, report.clone(), self.clock.now());

        Ok(report)
    }
}

pub struct WeatherServiceBuilder {
    providers: Vec<Box<dyn WeatherProvider>>,
    clock: Arc<dyn Clock>,
    cache: CacheSettings,
}

impl Default for WeatherServiceBuilder {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            clock: Arc::new(SystemClock),
            cache: CacheSettings::default(),
        }
    }
}

impl WeatherServiceBuilder {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = build_http_client(&config.http)?;

        Ok(Self {
            providers: providers_from_config(config, &http),
            cache: config.cache.clone(),
            ..Self::default()
        })
    }

    pub fn provider(mut self, provider: impl WeatherProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache_settings(mut self, settings: CacheSettings) -> Self {
        self.cache = settings;
        self
    }

    pub fn build(self) -> WeatherService {
        let cache = ReportCache::new(Duration::from_secs(self.cache.ttl_secs), self.cache.max_entries);

        WeatherService { providers: self.providers, cache, clock: self.clock }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::ManualClock, model::IconKey, provider::ProviderId};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug)]
    struct StubProvider {
        id: ProviderId,
        succeed: bool,
        delay: Duration,
        calls: Arc<AtomicUsize>,
        finished: Arc<AtomicBool>,
    }

    impl StubProvider {
        fn new(id: ProviderId, succeed: bool) -> Self {
            Self {
                id,
                succeed,
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
                finished: Arc::new(AtomicBool::new(false)),
            }
        }

        fn delayed(mut self, millis: u64) -> Self {
            self.delay = Duration::from_millis(millis);
            self
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn fetch(&self, query: &WeatherQuery) -> anyhow::Result<WeatherReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.finished.store(true, Ordering::SeqCst);

            if !self.succeed {
                return Err(anyhow!("{} unavailable", self.id));
            }
            Ok(WeatherReport {
                provider: self.id,
                location_label: format!("{}, Testland", query.as_str()),
                temperature_f: 70,
                humidity_percent: 40,
                condition_text: "sunny".into(),
                icon_key: IconKey::ClearDay,
            })
        }
    }

    fn query(s: &str) -> WeatherQuery {
        WeatherQuery::new(s).expect("valid query")
    }

    #[tokio::test]
    async fn single_success_wins_over_failures() {
        for winner in ProviderId::all() {
            let mut builder = WeatherService::builder();
            for id in ProviderId::all() {
                builder = builder.provider(StubProvider::new(*id, id == winner));
            }
            let service = builder.build();

            let report = service.get_weather(&query("Paris")).await.expect("report");
            assert_eq!(report.provider, *winner);
        }
    }

    #[tokio::test]
    async fn all_failures_surface_unified_error_and_skip_cache() {
        let service = WeatherService::builder()
            .provider(StubProvider::new(ProviderId::WeatherApi, false))
            .provider(StubProvider::new(ProviderId::OpenMeteo, false))
            .provider(StubProvider::new(ProviderId::Wttr, false))
            .build();

        let err = service.get_weather(&query("Paris")).await.unwrap_err();

        assert!(matches!(err, WeatherError::AllSourcesFailed));
        assert_eq!(err.to_string(), "Unable to fetch weather data from any source");
        service.cache.sync();
        assert!(service.cache.is_empty());
    }

    #[tokio::test]
    async fn no_providers_is_unified_failure() {
        let service = WeatherService::builder().build();
        let err = service.get_weather(&query("Paris")).await.unwrap_err();
        assert!(matches!(err, WeatherError::AllSourcesFailed));
    }

    #[tokio::test]
    async fn fresh_cache_hit_makes_no_calls() {
        let clock = Arc::new(ManualClock::new());
        let stub = StubProvider::new(ProviderId::Wttr, true);
        let calls = stub.calls.clone();
        let service = WeatherService::builder().provider(stub).clock(clock.clone()).build();

        let first = service.get_weather(&query("Paris")).await.expect("report");
        clock.advance(chrono::Duration::minutes(9) + chrono::Duration::seconds(59));
        let second = service.get_weather(&query(" PARIS ")).await.expect("report");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn stale_entry_triggers_new_race() {
        let clock = Arc::new(ManualClock::new());
        let stub = StubProvider::new(ProviderId::Wttr, true);
        let calls = stub.calls.clone();
        let service = WeatherService::builder().provider(stub).clock(clock.clone()).build();

        service.get_weather(&query("Paris")).await.expect("report");
        clock.advance(chrono::Duration::minutes(10));
        let report = service.get_weather(&query("paris")).await.expect("report");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // providers see the caller's casing, not the cache key
        assert_eq!(report.location_label, "paris, Testland");
    }

    #[tokio::test]
    async fn failed_race_leaves_no_cache_entry() {
        let service = WeatherService::builder()
            .provider(StubProvider::new(ProviderId::OpenMeteo, false))
            .build();

        assert!(service.get_weather(&query("Lima")).await.is_err());
        assert!(!service.cache.contains_key("lima"));
    }

    #[tokio::test]
    async fn fastest_success_wins() {
        let service = WeatherService::builder()
            .provider(StubProvider::new(ProviderId::WeatherApi, true).delayed(300))
            .provider(StubProvider::new(ProviderId::OpenMeteo, true).delayed(10))
            .provider(StubProvider::new(ProviderId::Wttr, false))
            .build();

        let report = service.get_weather(&query("Rome")).await.expect("report");
        assert_eq!(report.provider, ProviderId::OpenMeteo);
    }

    #[tokio::test]
    async fn losers_are_dropped_once_a_winner_is_chosen() {
        let slow = StubProvider::new(ProviderId::WeatherApi, true).delayed(200);
        let slow_finished = slow.finished.clone();

        let service = WeatherService::builder()
            .provider(slow)
            .provider(StubProvider::new(ProviderId::Wttr, true))
            .build();

        let report = service.get_weather(&query("Rome")).await.expect("report");
        assert_eq!(report.provider, ProviderId::Wttr);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!slow_finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cache_bound_comes_from_settings() {
        let service = WeatherService::builder()
            .provider(StubProvider::new(ProviderId::Wttr, true))
            .cache_settings(CacheSettings { ttl_secs: 600, max_entries: 2 })
            .build();

        for city in ["Oslo", "Bergen", "Tromso"] {
            service.get_weather(&query(city)).await.expect("report");
        }

        service.cache.sync();
        assert_eq!(service.cache.len(), 2);
        assert!(service.cache.contains_key("tromso"));
    }
}
