//! Weather Fetching
//!
//! One upstream call per coordinate, normalized into [`CurrentConditions`]
//! (for direct queries) or the slimmer [`WeatherSummary`] the composer needs.

mod open_meteo;

pub use open_meteo::OpenMeteoWeather;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Coordinate, CurrentConditions, WeatherSummary};

/// Condition text used for codes missing from the WMO table
pub const UNKNOWN_CONDITION: &str = "unknown";

/// Short English description for a WMO weather interpretation code
pub const fn describe_weather_code(code: i32) -> &'static str {
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
        80 => "rain showers",
        81 => "moderate rain showers",
        82 => "violent rain showers",
        95 => "thunderstorm",
        _ => UNKNOWN_CONDITION,
    }
}

/// Current-weather source (Strategy pattern)
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    /// Full current conditions at `coord`. No retry.
    async fn current(&self, coord: Coordinate) -> Result<CurrentConditions>;

    /// Prompt-ready summary at `coord`
    async fn fetch(&self, coord: Coordinate) -> Result<WeatherSummary> {
        Ok(self.current(coord).await?.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(describe_weather_code(0), "clear sky");
        assert_eq!(describe_weather_code(3), "overcast");
        assert_eq!(describe_weather_code(48), "depositing rime fog");
        assert_eq!(describe_weather_code(82), "violent rain showers");
        assert_eq!(describe_weather_code(95), "thunderstorm");
    }

    #[test]
    fn test_unmapped_codes_are_unknown() {
        // WMO codes missing from the table
        for code in [56, 66, 77, 85, 96, 99, -1] {
            assert_eq!(describe_weather_code(code), UNKNOWN_CONDITION);
        }
    }
}
