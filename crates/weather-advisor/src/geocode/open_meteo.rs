//! Open-Meteo geocoding backend

use std::sync::Arc;

use advisor_core::{AdvisorMetrics, Operation, Outcome};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{GeocodeMatch, Geocoder};
use crate::config::UpstreamConfig;
use crate::error::Result;
use crate::http;

/// `GET {base}/search?name=..&count=..`
#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Absent entirely when nothing matched
    #[serde(default)]
    results: Vec<GeocodeMatch>,
}

pub struct OpenMeteoGeocoder {
    client: Client,
    base_url: String,
    metrics: Arc<AdvisorMetrics>,
}

impl OpenMeteoGeocoder {
    pub fn new(config: &UpstreamConfig, metrics: Arc<AdvisorMetrics>) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout)?,
            base_url: config.geocoding_base_url.trim_end_matches('/').to_string(),
            metrics,
        })
    }

    async fn request(&self, name: &str, limit: u8) -> Result<Vec<GeocodeMatch>> {
        let url = format!("{}/search", self.base_url);
        debug!(url = %url, "Geocoding");

        let count = limit.to_string();
        let request = self.client.get(&url).query(&[
            ("name", name),
            ("count", count.as_str()),
            ("language", "en"),
            ("format", "json"),
        ]);

        let response: SearchResponse = http::get_json(request).await?;
        Ok(response.results)
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    #[instrument(skip(self))]
    async fn search(&self, name: &str, limit: u8) -> Result<Vec<GeocodeMatch>> {
        let timer = self.metrics.start(Operation::Geocode);
        let result = self.request(name, limit).await;
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

    #[test]
    fn missing_results_field_is_empty() {
        let response: SearchResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn decodes_candidates_with_optional_regions() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"results":[
                {"id":1,"name":"Berlin","latitude":52.52,"longitude":13.41,"country":"Germany","admin1":"Land Berlin"},
                {"id":2,"name":"Berlin","latitude":44.47,"longitude":-71.18}
            ]}"#,
        )
        .unwrap();

        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].admin1.as_deref(), Some("Land Berlin"));
        assert!(response.results[1].country.is_none());
    }
}
