//! Open-Meteo forecast backend

use std::sync::Arc;

use advisor_core::{AdvisorMetrics, Operation, Outcome};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{WeatherFetcher, describe_weather_code};
use crate::config::UpstreamConfig;
use crate::error::Result;
use crate::http;
use crate::model::{Coordinate, CurrentConditions};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
                              weather_code,wind_speed_10m,wind_direction_10m,surface_pressure";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min";

/// Standard sea-level pressure, used when the upstream omits it
const DEFAULT_PRESSURE_HPA: i32 = 1013;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentData,
    #[serde(default)]
    daily: Option<DailyData>,
}

#[derive(Debug, Deserialize)]
struct CurrentData {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    #[serde(default)]
    apparent_temperature: Option<f64>,
    weather_code: i32,
    wind_speed_10m: f64,
    #[serde(default)]
    wind_direction_10m: f64,
    #[serde(default)]
    surface_pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct DailyData {
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
}

fn first(values: &[Option<f64>]) -> Option<f64> {
    values.first().copied().flatten()
}

impl ForecastResponse {
    #[allow(clippy::cast_possible_truncation)]
    fn into_conditions(self, coord: Coordinate, timestamp: i64) -> CurrentConditions {
        let current = self.current;
        let daily = self.daily.unwrap_or_default();
        let temperature = current.temperature_2m;

        CurrentConditions {
            location: coord.label(),
            temperature,
            feels_like: current.apparent_temperature.unwrap_or(temperature),
            temp_min: first(&daily.temperature_2m_min).unwrap_or(temperature),
            temp_max: first(&daily.temperature_2m_max).unwrap_or(temperature),
            pressure: current
                .surface_pressure
                .map_or(DEFAULT_PRESSURE_HPA, |p| p.round() as i32),
            humidity: current.relative_humidity_2m.round() as i32,
            wind_speed: current.wind_speed_10m,
            wind_deg: current.wind_direction_10m.round() as i32,
            timestamp,
            description: describe_weather_code(current.weather_code).to_string(),
        }
    }
}

pub struct OpenMeteoWeather {
    client: Client,
    base_url: String,
    metrics: Arc<AdvisorMetrics>,
}

impl OpenMeteoWeather {
    pub fn new(config: &UpstreamConfig, metrics: Arc<AdvisorMetrics>) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout)?,
            base_url: config.weather_base_url.trim_end_matches('/').to_string(),
            metrics,
        })
    }

    async fn request(&self, coord: Coordinate) -> Result<CurrentConditions> {
        let coord = coord.validate()?;
        let url = format!("{}/forecast", self.base_url);
        debug!(url = %url, location = %coord.label(), "Fetching current weather");

        let latitude = coord.latitude.to_string();
        let longitude = coord.longitude.to_string();
        let request = self.client.get(&url).query(&[
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("current", CURRENT_FIELDS),
            ("daily", DAILY_FIELDS),
            ("wind_speed_unit", "ms"),
            ("forecast_days", "1"),
            ("timezone", "auto"),
        ]);

        let response: ForecastResponse = http::get_json(request).await?;
        Ok(response.into_conditions(coord, chrono::Utc::now().timestamp()))
    }
}

#[async_trait]
impl WeatherFetcher for OpenMeteoWeather {
    #[instrument(skip(self), fields(lat = %coord.latitude, lon = %coord.longitude))]
    async fn current(&self, coord: Coordinate) -> Result<CurrentConditions> {
        let timer = self.metrics.start(Operation::Weather);
        let result = self.request(coord).await;
        timer.finish(if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Error
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> ForecastResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_full_response() {
        let response = decode(
            r#"{
                "current": {
                    "time": "2026-10-19T14:00", "temperature_2m": 14.2,
                    "relative_humidity_2m": 77, "apparent_temperature": 12.9,
                    "weather_code": 61, "wind_speed_10m": 4.3,
                    "wind_direction_10m": 225, "surface_pressure": 1008.6
                },
                "daily": {"temperature_2m_max": [16.1], "temperature_2m_min": [9.8]}
            }"#,
        );
        let conditions = response.into_conditions(Coordinate::new(51.5074, -0.1278), 1_700_000_000);

        assert_eq!(conditions.location, "51.51,-0.13");
        assert!((conditions.feels_like - 12.9).abs() < f64::EPSILON);
        assert!((conditions.temp_max - 16.1).abs() < f64::EPSILON);
        assert!((conditions.temp_min - 9.8).abs() < f64::EPSILON);
        assert_eq!(conditions.pressure, 1009);
        assert_eq!(conditions.humidity, 77);
        assert_eq!(conditions.wind_deg, 225);
        assert_eq!(conditions.timestamp, 1_700_000_000);
        assert_eq!(conditions.description, "slight rain");
    }

    #[test]
    fn test_missing_optional_fields_fall_back() {
        let response = decode(
            r#"{"current": {
                "temperature_2m": 20.0, "relative_humidity_2m": 40,
                "weather_code": 7, "wind_speed_10m": 1.0
            }}"#,
        );
        let conditions = response.into_conditions(Coordinate::new(0.0, 0.0), 0);

        assert!((conditions.feels_like - 20.0).abs() < f64::EPSILON);
        assert!((conditions.temp_min - 20.0).abs() < f64::EPSILON);
        assert!((conditions.temp_max - 20.0).abs() < f64::EPSILON);
        assert_eq!(conditions.pressure, DEFAULT_PRESSURE_HPA);
        assert_eq!(conditions.description, "unknown");
    }

    #[test]
    fn test_missing_current_block_is_decode_failure() {
        assert!(serde_json::from_str::<ForecastResponse>(r#"{"daily": {}}"#).is_err());
    }
}
