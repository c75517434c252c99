//! # weather-advisor
//!
//! Weather-aware advice for one or more cities: resolve each name to a
//! coordinate, fetch its current conditions, then ask a text-generation
//! backend for practical advice, either in one piece or as a stream.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  AdviceRequest ["London", "Springfield, Illinois"]          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  for each city, in order:                                   │
//! │    CoordinateResolver   curated table ─▶ Geocoder           │
//! │    WeatherFetcher       Open-Meteo forecast ─▶ summary      │
//! │  first failure aborts: "<step> failed for <city>: ..."      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AdvisoryComposer                                           │
//! │    compose_once    ─▶ advice text                           │
//! │    compose_stream  ─▶ fragment, fragment, ..., { "", final }│
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod composer;
pub mod config;
pub mod error;
pub mod geocode;
mod http;
pub mod model;
pub mod orchestrator;
pub mod weather;

pub use composer::{AdvisoryComposer, build_prompt};
pub use config::{AdvisorConfig, UpstreamConfig};
pub use error::{AdvisorError, CityStep, ErrorKind, Result};
pub use geocode::{CoordinateResolver, GeocodeMatch, Geocoder, KNOWN_CITIES, OpenMeteoGeocoder};
pub use model::{
    AdviceFragment, AdviceRequest, CityRequest, Coordinate, CurrentConditions, StreamOutcome,
    WeatherSummary,
};
pub use orchestrator::{Advice, AdviceOrchestrator};
pub use weather::{OpenMeteoWeather, WeatherFetcher, describe_weather_code};
