//! Error Types for the Weather Advisor

use std::time::Duration;

use advisor_core::ProviderError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Which per-city step failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CityStep {
    Resolve,
    FetchWeather,
}

impl std::fmt::Display for CityStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolve => write!(f, "geocoding"),
            Self::FetchWeather => write!(f, "weather request"),
        }
    }
}

/// Error classification, independent of city attribution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    UpstreamUnavailable,
    Decode,
    Generation,
    NoResponse,
    InvalidRequest,
    DeadlineExceeded,
}

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("location not found: {name} (try: {hint})")]
    NotFound { name: String, hint: String },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("no response generated")]
    NoResponse,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("deadline of {}s exceeded", .0.as_secs())]
    DeadlineExceeded(Duration),

    /// A failure attributed to one city of the request
    #[error("{step} failed for {city}: {source}")]
    City {
        city: String,
        step: CityStep,
        #[source]
        source: Box<AdvisorError>,
    },
}

impl AdvisorError {
    /// Attribute this error to `city` at `step`
    pub fn for_city(self, city: impl Into<String>, step: CityStep) -> Self {
        Self::City {
            city: city.into(),
            step,
            source: Box::new(self),
        }
    }

    /// Classification, looking through city attribution
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Generation(_) => ErrorKind::Generation,
            Self::NoResponse => ErrorKind::NoResponse,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            Self::City { source, .. } => source.kind(),
        }
    }

    /// City this error was attributed to, if any
    pub fn city(&self) -> Option<&str> {
        match self {
            Self::City { city, .. } => Some(city),
            _ => None,
        }
    }

    /// Step this error was attributed to, if any
    pub const fn step(&self) -> Option<CityStep> {
        match self {
            Self::City { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorKind::Decode => "DECODE_ERROR",
            ErrorKind::Generation => "GENERATION_ERROR",
            ErrorKind::NoResponse => "NO_RESPONSE",
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }
}

impl From<ProviderError> for AdvisorError {
    fn from(err: ProviderError) -> Self {
        match err {
            e if e.is_unavailable() => Self::UpstreamUnavailable(e.to_string()),
            ProviderError::NoCandidates(_) => Self::NoResponse,
            e @ ProviderError::Parse(_) => Self::Decode(e.to_string()),
            e => Self::Generation(e.to_string()),
        }
    }
}
