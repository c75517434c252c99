//! Coordinate Resolution
//!
//! Two-tier lookup: an exact-match table of well-known cities first, then a
//! remote geocoder for everything else.

mod open_meteo;

pub use open_meteo::OpenMeteoGeocoder;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AdvisorError, Result};
use crate::model::{CityRequest, Coordinate};

/// Curated cities resolved without any network call.
/// Matched exactly and case-sensitively.
pub const KNOWN_CITIES: [(&str, Coordinate); 7] = [
    ("New York", Coordinate::new(40.7128, -74.0060)),
    ("London", Coordinate::new(51.5074, -0.1278)),
    ("Tokyo", Coordinate::new(35.6762, 139.6503)),
    ("Paris", Coordinate::new(48.8566, 2.3522)),
    ("Los Angeles", Coordinate::new(34.0522, -118.2437)),
    ("Chicago", Coordinate::new(41.8781, -87.6298)),
    ("Sydney", Coordinate::new(-33.8688, 151.2093)),
];

/// How many candidates to ask for when hints need to pick between them
const HINTED_CANDIDATES: u8 = 10;

/// One geocoder candidate
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GeocodeMatch {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    /// First-level admin region (state, province)
    #[serde(default)]
    pub admin1: Option<String>,
}

impl GeocodeMatch {
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    fn matches_hints(&self, city: &CityRequest) -> bool {
        let eq = |hint: &Option<String>, value: &Option<String>| match (hint, value) {
            (Some(h), Some(v)) => h.eq_ignore_ascii_case(v),
            (Some(_), None) => false,
            (None, _) => true,
        };
        eq(&city.country, &self.country) && eq(&city.state, &self.admin1)
    }
}

/// Remote geocoding backend (Strategy pattern)
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Up to `limit` candidates for `name`, best first. Empty when nothing
    /// matched; that is not an error at this level.
    async fn search(&self, name: &str, limit: u8) -> Result<Vec<GeocodeMatch>>;
}

/// Names from [`KNOWN_CITIES`], for hint messages
pub fn known_city_names() -> String {
    KNOWN_CITIES
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Curated coordinate for `name`, if it is one of [`KNOWN_CITIES`]
pub fn lookup_known(name: &str) -> Option<Coordinate> {
    KNOWN_CITIES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, coord)| *coord)
}

/// Place name to coordinate resolver
#[derive(Clone)]
pub struct CoordinateResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl CoordinateResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Resolve one city. Resolved fresh on every call; nothing is cached.
    pub async fn resolve(&self, city: &CityRequest) -> Result<Coordinate> {
        if city.name.trim().is_empty() {
            return Err(AdvisorError::InvalidRequest("city name is empty".into()));
        }

        if let Some(coord) = lookup_known(&city.name) {
            tracing::debug!(city = %city.name, "resolved from curated table");
            return Ok(coord);
        }

        let limit = if city.has_hints() { HINTED_CANDIDATES } else { 1 };
        let candidates = self.geocoder.search(&city.name, limit).await?;

        let chosen = candidates
            .iter()
            .find(|c| c.matches_hints(city))
            .or_else(|| candidates.first())
            .ok_or_else(|| AdvisorError::NotFound {
                name: city.name.clone(),
                hint: known_city_names(),
            })?;

        tracing::debug!(
            city = %city.name,
            matched = %chosen.name,
            country = chosen.country.as_deref().unwrap_or("-"),
            "resolved via geocoder"
        );
        Ok(chosen.coordinate())
    }
}
