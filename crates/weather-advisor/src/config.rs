//! Configuration
//!
//! Read from environment variables; every field has a default.

use std::time::Duration;

/// Outbound weather/geocoding endpoints
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    /// Open-Meteo forecast API base URL
    pub weather_base_url: String,

    /// Open-Meteo geocoding API base URL
    pub geocoding_base_url: String,

    /// Per-call timeout for weather and geocoding requests
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            weather_base_url: "https://api.open-meteo.com/v1".into(),
            geocoding_base_url: "https://geocoding-api.open-meteo.com/v1".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            weather_base_url: std::env::var("WEATHER_BASE_URL")
                .unwrap_or(defaults.weather_base_url),
            geocoding_base_url: std::env::var("GEOCODING_BASE_URL")
                .unwrap_or(defaults.geocoding_base_url),
            timeout: env_secs("UPSTREAM_TIMEOUT_SECS").unwrap_or(defaults.timeout),
        }
    }
}

/// Orchestrator ceilings and relay sizing
#[derive(Clone, Debug)]
pub struct AdvisorConfig {
    /// Ceiling for a single-shot advice call
    pub advice_timeout: Duration,

    /// Ceiling for a streaming advice call
    pub stream_timeout: Duration,

    /// Capacity of the fragment relay channel
    pub stream_buffer: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            advice_timeout: Duration::from_secs(30),
            stream_timeout: Duration::from_secs(60),
            stream_buffer: 32,
        }
    }
}

impl AdvisorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            advice_timeout: env_secs("ADVICE_TIMEOUT_SECS").unwrap_or(defaults.advice_timeout),
            stream_timeout: env_secs("STREAM_TIMEOUT_SECS").unwrap_or(defaults.stream_timeout),
            stream_buffer: std::env::var("STREAM_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.stream_buffer),
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
