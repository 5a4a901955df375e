// Process configuration read from the environment.
//
// Every value has a default. An unparseable value is logged and replaced by its default, it never
// stops the process. Durations are given in milliseconds. Durations that pace a loop (poll timeout,
// settle interval, retry delays) must be positive; zero is treated like an unparseable value.

use crate::modules::correlation::use_cases::ingest_stream::backoff::BackoffSettings;
use crate::modules::correlation::use_cases::query_by_token::observer::ObserverSettings;
use crate::modules::events::use_cases::publish_events::publisher::PublisherSettings;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_HTTP_PORT: u16 = 8097;
pub const DEFAULT_BROKER: &str = "localhost:19092";
pub const DEFAULT_TOPIC: &str = "eventsource";
pub const DEFAULT_PARTITIONS: u32 = 10;
pub const DEFAULT_TTL_MS: u64 = 30_000;
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_OBSERVATION_WINDOW_MS: u64 = 10_000;
pub const DEFAULT_SETTLE_INTERVAL_MS: u64 = 100;
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_FAN_OUT_SIZE: i32 = 5;
pub const DEFAULT_PADDING_BYTES: usize = 10 * 1024;
pub const DEFAULT_NOISE_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_CONSUMER_GROUP_PREFIX: &str = "eventsource_observer";
pub const DEFAULT_STREAM_RETENTION_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    /// Reported only; the stream runs in process.
    pub broker: String,
    pub topic: String,
    pub partitions: u32,
    pub ttl: Duration,
    pub cleanup_interval: Duration,
    pub observation_window: Duration,
    pub settle_interval: Duration,
    pub poll_timeout: Duration,
    pub publish_timeout: Duration,
    pub retry: BackoffSettings,
    pub fan_out_size: i32,
    pub padding_size: usize,
    /// `None` disables the noise maker.
    pub noise_interval: Option<Duration>,
    pub consumer_group_prefix: String,
    /// How long the in-process stream keeps records. `None` keeps them forever.
    pub stream_retention: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT)),
            broker: DEFAULT_BROKER.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            partitions: DEFAULT_PARTITIONS,
            ttl: Duration::from_millis(DEFAULT_TTL_MS),
            cleanup_interval: Duration::from_millis(DEFAULT_CLEANUP_INTERVAL_MS),
            observation_window: Duration::from_millis(DEFAULT_OBSERVATION_WINDOW_MS),
            settle_interval: Duration::from_millis(DEFAULT_SETTLE_INTERVAL_MS),
            poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
            publish_timeout: Duration::from_millis(DEFAULT_PUBLISH_TIMEOUT_MS),
            retry: BackoffSettings::default(),
            fan_out_size: DEFAULT_FAN_OUT_SIZE,
            padding_size: DEFAULT_PADDING_BYTES,
            noise_interval: Some(Duration::from_millis(DEFAULT_NOISE_INTERVAL_MS)),
            consumer_group_prefix: DEFAULT_CONSUMER_GROUP_PREFIX.to_string(),
            stream_retention: Some(Duration::from_millis(DEFAULT_STREAM_RETENTION_MS)),
        }
    }
}

impl AppConfig {
    /// Reads `EVENTSOURCE_*` variables, falling back to the defaults.
    ///
    /// - `EVENTSOURCE_HTTP_ADDR` (default `0.0.0.0:8097`)
    /// - `EVENTSOURCE_BROKER` (default `localhost:19092`)
    /// - `EVENTSOURCE_TOPIC` (default `eventsource`)
    /// - `EVENTSOURCE_PARTITIONS` (default 10)
    /// - `EVENTSOURCE_TTL_MS`, `EVENTSOURCE_CLEANUP_INTERVAL_MS` (default 30000 each)
    /// - `EVENTSOURCE_OBSERVATION_WINDOW_MS` (default 10000)
    /// - `EVENTSOURCE_SETTLE_INTERVAL_MS` (default 100)
    /// - `EVENTSOURCE_POLL_TIMEOUT_MS` (default 1000)
    /// - `EVENTSOURCE_PUBLISH_TIMEOUT_MS` (default 10000)
    /// - `EVENTSOURCE_RETRY_INITIAL_MS`, `EVENTSOURCE_RETRY_MAX_MS` (default 100, 5000)
    /// - `EVENTSOURCE_FAN_OUT_SIZE` (default 5)
    /// - `EVENTSOURCE_PADDING_BYTES` (default 10240)
    /// - `EVENTSOURCE_NOISE_INTERVAL_MS` (default 3000, 0 disables)
    /// - `EVENTSOURCE_CONSUMER_GROUP_PREFIX` (default `eventsource_observer`)
    /// - `EVENTSOURCE_STREAM_RETENTION_MS` (default 60000, 0 keeps records forever)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |name: &str, default: Duration| {
            Duration::from_millis(parse_or(&lookup, name, default.as_millis() as u64))
        };
        let pacing = |name: &str, default: Duration| {
            let value = millis(name, default);
            if value.is_zero() {
                warn!(variable = name, "zero is not allowed here, using default");
                return default;
            }
            value
        };
        let noise_ms = parse_or(
            &lookup,
            "EVENTSOURCE_NOISE_INTERVAL_MS",
            DEFAULT_NOISE_INTERVAL_MS,
        );
        let retention_ms = parse_or(
            &lookup,
            "EVENTSOURCE_STREAM_RETENTION_MS",
            DEFAULT_STREAM_RETENTION_MS,
        );

        Self {
            http_addr: parse_or(&lookup, "EVENTSOURCE_HTTP_ADDR", defaults.http_addr),
            broker: lookup("EVENTSOURCE_BROKER").unwrap_or(defaults.broker),
            topic: lookup("EVENTSOURCE_TOPIC").unwrap_or(defaults.topic),
            partitions: parse_or(&lookup, "EVENTSOURCE_PARTITIONS", defaults.partitions).max(1),
            ttl: millis("EVENTSOURCE_TTL_MS", defaults.ttl),
            cleanup_interval: millis("EVENTSOURCE_CLEANUP_INTERVAL_MS", defaults.cleanup_interval),
            observation_window: millis(
                "EVENTSOURCE_OBSERVATION_WINDOW_MS",
                defaults.observation_window,
            ),
            settle_interval: pacing("EVENTSOURCE_SETTLE_INTERVAL_MS", defaults.settle_interval),
            poll_timeout: pacing("EVENTSOURCE_POLL_TIMEOUT_MS", defaults.poll_timeout),
            publish_timeout: millis("EVENTSOURCE_PUBLISH_TIMEOUT_MS", defaults.publish_timeout),
            retry: BackoffSettings {
                initial_delay: pacing("EVENTSOURCE_RETRY_INITIAL_MS", defaults.retry.initial_delay),
                max_delay: pacing("EVENTSOURCE_RETRY_MAX_MS", defaults.retry.max_delay),
                ..defaults.retry
            },
            fan_out_size: parse_or(&lookup, "EVENTSOURCE_FAN_OUT_SIZE", defaults.fan_out_size),
            padding_size: parse_or(&lookup, "EVENTSOURCE_PADDING_BYTES", defaults.padding_size),
            noise_interval: (noise_ms > 0).then(|| Duration::from_millis(noise_ms)),
            consumer_group_prefix: lookup("EVENTSOURCE_CONSUMER_GROUP_PREFIX")
                .unwrap_or(defaults.consumer_group_prefix),
            stream_retention: (retention_ms > 0).then(|| Duration::from_millis(retention_ms)),
        }
    }

    pub fn publisher_settings(&self) -> PublisherSettings {
        PublisherSettings {
            topic: self.topic.clone(),
            partitions: self.partitions,
            padding_size: self.padding_size,
            publish_timeout: self.publish_timeout,
        }
    }

    pub fn observer_settings(&self) -> ObserverSettings {
        ObserverSettings {
            ttl: self.ttl,
            cleanup_interval: self.cleanup_interval,
            poll_timeout: self.poll_timeout,
            observation_window: self.observation_window,
            settle_interval: self.settle_interval,
            backoff: self.retry,
            consumer_group_prefix: self.consumer_group_prefix.clone(),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(error) => {
            warn!(variable = name, %raw, %error, "invalid configuration value, using default");
            default
        }
    }
}
