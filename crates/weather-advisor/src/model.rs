//! Domain Models
//!
//! All records here are request-scoped: built while handling one call and
//! dropped when it returns.

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

/// One requested city. Identity is `name`; the hints only help the
/// geocoder choose between homonyms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CityRequestRepr")]
pub struct CityRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Accepts either `"London"` or `{"name": "London", "country": "UK"}`
#[derive(Deserialize)]
#[serde(untagged)]
enum CityRequestRepr {
    Name(String),
    Full {
        #[serde(alias = "location")]
        name: String,
        #[serde(default)]
        state: Option<String>,
        #[serde(default)]
        country: Option<String>,
    },
}

impl From<CityRequestRepr> for CityRequest {
    fn from(repr: CityRequestRepr) -> Self {
        match repr {
            CityRequestRepr::Name(name) => Self::new(name),
            CityRequestRepr::Full {
                name,
                state,
                country,
            } => Self {
                name,
                state,
                country,
            },
        }
    }
}

impl CityRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: None,
            country: None,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub(crate) fn has_hints(&self) -> bool {
        self.state.is_some() || self.country.is_some()
    }
}

impl From<&str> for CityRequest {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Ordered list of cities; order drives fetch order and prompt order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceRequest {
    pub cities: Vec<CityRequest>,
}

impl AdviceRequest {
    pub fn new<I, C>(cities: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CityRequest>,
    {
        Self {
            cities: cities.into_iter().map(Into::into).collect(),
        }
    }

    /// At least one city, none blank
    pub fn validate(&self) -> Result<()> {
        if self.cities.is_empty() {
            return Err(AdvisorError::InvalidRequest(
                "at least one city is required".into(),
            ));
        }
        if let Some(pos) = self.cities.iter().position(|c| c.name.trim().is_empty()) {
            return Err(AdvisorError::InvalidRequest(format!(
                "city #{} has an empty name",
                pos + 1
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject coordinates outside the valid latitude/longitude ranges
    pub fn validate(self) -> Result<Self> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(AdvisorError::InvalidRequest(
                "latitude must be -90 to 90, longitude must be -180 to 180".into(),
            ));
        }
        Ok(self)
    }

    /// `"40.71,-74.01"`
    pub fn label(self) -> String {
        format!("{:.2},{:.2}", self.latitude, self.longitude)
    }
}

/// Normalized per-city weather used to build the advice prompt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub location_label: String,
    pub temperature_c: f64,
    pub condition: String,
    pub humidity_pct: i32,
    pub wind_speed: f64,
}

impl WeatherSummary {
    /// One prompt line
    pub fn prompt_line(&self) -> String {
        format!(
            "City: {}, Temp: {:.1}°C, Condition: {}, Humidity: {}%, Wind: {:.1} m/s",
            self.location_label, self.temperature_c, self.condition, self.humidity_pct, self.wind_speed
        )
    }
}

/// Full current-conditions record returned by `GetCurrentWeather`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i32,
    pub humidity: i32,
    pub wind_speed: f64,
    pub wind_deg: i32,
    pub timestamp: i64,
    pub description: String,
}

impl CurrentConditions {
    pub fn summary(&self) -> WeatherSummary {
        WeatherSummary {
            location_label: self.location.clone(),
            temperature_c: self.temperature,
            condition: self.description.clone(),
            humidity_pct: self.humidity,
            wind_speed: self.wind_speed,
        }
    }
}

/// One unit of streamed advice. The last one of a successful stream is
/// `{ text: "", is_final: true }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceFragment {
    pub text: String,
    pub is_final: bool,
}

impl AdviceFragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub const fn terminal() -> Self {
        Self {
            text: String::new(),
            is_final: true,
        }
    }
}

/// How a streaming call ended when it did not fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Terminal fragment delivered
    Completed,
    /// Caller dropped the fragment channel
    Cancelled,
    /// Streaming ceiling reached before completion
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_request_accepts_bare_string_and_object() {
        let cities: Vec<CityRequest> = serde_json::from_str(
            r#"["London", {"name": "Paris", "country": "France"}, {"location": "Tokyo"}]"#,
        )
        .unwrap();

        assert_eq!(cities[0], CityRequest::new("London"));
        assert_eq!(cities[1], CityRequest::new("Paris").with_country("France"));
        assert_eq!(cities[2].name, "Tokyo");
    }

    #[test]
    fn advice_request_validation() {
        assert!(AdviceRequest::default().validate().is_err());
        assert!(AdviceRequest::new(["London", "  "]).validate().is_err());
        assert!(AdviceRequest::new(["London", "Paris"]).validate().is_ok());
    }

    #[test]
    fn coordinate_validation() {
        assert!(Coordinate::new(0.0, 0.0).validate().is_ok());
        assert!(Coordinate::new(90.0, -180.0).validate().is_ok());
        assert!(Coordinate::new(91.0, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, 180.5).validate().is_err());
    }

    #[test]
    fn coordinate_label() {
        assert_eq!(Coordinate::new(40.7128, -74.0060).label(), "40.71,-74.01");
    }

    #[test]
    fn summary_prompt_line() {
        let summary = WeatherSummary {
            location_label: "London".into(),
            temperature_c: 12.34,
            condition: "overcast".into(),
            humidity_pct: 81,
            wind_speed: 5.06,
        };
        assert_eq!(
            summary.prompt_line(),
            "City: London, Temp: 12.3°C, Condition: overcast, Humidity: 81%, Wind: 5.1 m/s"
        );
    }

    #[test]
    fn terminal_fragment_is_empty_and_final() {
        let fragment = AdviceFragment::terminal();
        assert!(fragment.text.is_empty());
        assert!(fragment.is_final);
        assert!(!AdviceFragment::text("hi").is_final);
    }
}
