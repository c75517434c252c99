//! Advice Orchestrator
//!
//! Drives one advice request through
//! `ResolvingCity[i] -> FetchingWeather[i] -> Composing -> Streaming|Complete`.
//! Cities are handled strictly in input order; the first failure aborts the
//! request and names the city and step that failed.

use std::sync::Arc;

use advisor_core::{AdvisorMetrics, Operation, Outcome};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::composer::AdvisoryComposer;
use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, CityStep, ErrorKind, Result};
use crate::geocode::CoordinateResolver;
use crate::model::{
    AdviceFragment, AdviceRequest, Coordinate, CurrentConditions, StreamOutcome, WeatherSummary,
};
use crate::weather::WeatherFetcher;

/// Single-shot result
#[derive(Clone, Debug)]
pub struct Advice {
    pub request_id: Uuid,
    pub text: String,
}

pub struct AdviceOrchestrator {
    resolver: CoordinateResolver,
    weather: Arc<dyn WeatherFetcher>,
    composer: AdvisoryComposer,
    metrics: Arc<AdvisorMetrics>,
    config: AdvisorConfig,
}

impl AdviceOrchestrator {
    pub fn new(
        resolver: CoordinateResolver,
        weather: Arc<dyn WeatherFetcher>,
        composer: AdvisoryComposer,
        metrics: Arc<AdvisorMetrics>,
        config: AdvisorConfig,
    ) -> Self {
        Self {
            resolver,
            weather,
            composer,
            metrics,
            config,
        }
    }

    pub const fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub const fn composer(&self) -> &AdvisoryComposer {
        &self.composer
    }

    /// Resolve and fetch every city, in order
    async fn gather(&self, request: &AdviceRequest) -> Result<Vec<WeatherSummary>> {
        request.validate()?;

        let mut summaries = Vec::with_capacity(request.cities.len());
        for (index, city) in request.cities.iter().enumerate() {
            debug!(index, city = %city.name, "ResolvingCity");
            let coord = self
                .resolver
                .resolve(city)
                .await
                .map_err(|e| e.for_city(&city.name, CityStep::Resolve))?;

            debug!(index, city = %city.name, location = %coord.label(), "FetchingWeather");
            let mut summary = self
                .weather
                .fetch(coord)
                .await
                .map_err(|e| e.for_city(&city.name, CityStep::FetchWeather))?;

            // Label by the requested name so the advice can refer to it
            summary.location_label.clone_from(&city.name);
            summaries.push(summary);
        }

        debug!(cities = summaries.len(), "Composing");
        Ok(summaries)
    }

    /// Complete advice text for `request`, bounded by `advice_timeout`
    pub async fn get_advice(&self, request: &AdviceRequest) -> Result<Advice> {
        let request_id = Uuid::new_v4();
        let span = info_span!("get_advice", %request_id, cities = request.cities.len());

        async {
            let timer = self.metrics.start(Operation::GetAdvice);
            let work = async {
                let summaries = self.gather(request).await?;
                self.composer.compose_once(&summaries).await
            };

            let result = timeout(self.config.advice_timeout, work)
                .await
                .unwrap_or(Err(AdvisorError::DeadlineExceeded(self.config.advice_timeout)));

            match result {
                Ok(text) => {
                    timer.finish(Outcome::Success);
                    info!(chars = text.len(), "Done");
                    Ok(Advice { request_id, text })
                }
                Err(e) => {
                    timer.finish(Outcome::Error);
                    log_failure(&e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Relay advice fragments for `request` into `sink`.
    ///
    /// Returns once the terminal fragment is queued (`Completed`), the
    /// receiver is dropped (`Cancelled`) or `stream_timeout` elapses
    /// (`TimedOut`). Dropping `sink` on return closes the channel, so after
    /// an `Err` the receiver sees the channel end without a terminal
    /// fragment. No fragment is sent before every city has been fetched.
    pub async fn stream_advice(
        &self,
        request: &AdviceRequest,
        sink: mpsc::Sender<AdviceFragment>,
    ) -> Result<StreamOutcome> {
        let request_id = Uuid::new_v4();
        let span = info_span!("stream_advice", %request_id, cities = request.cities.len());

        async {
            let timer = self.metrics.start(Operation::StreamAdvice);
            let work = async {
                let summaries = self.gather(request).await?;
                debug!("Streaming");
                self.composer.compose_stream(&summaries, &sink).await
            };

            let result = tokio::select! {
                biased;
                () = sink.closed() => Ok(StreamOutcome::Cancelled),
                result = timeout(self.config.stream_timeout, work) => {
                    result.unwrap_or(Ok(StreamOutcome::TimedOut))
                }
            };

            match &result {
                Ok(StreamOutcome::Completed) => {
                    timer.finish(Outcome::Success);
                    info!("Done");
                }
                Ok(StreamOutcome::Cancelled) => {
                    timer.finish(Outcome::Cancelled);
                    debug!("Caller went away; stream cancelled");
                }
                Ok(StreamOutcome::TimedOut) => {
                    timer.finish(Outcome::Cancelled);
                    info!(
                        limit_secs = self.config.stream_timeout.as_secs(),
                        "Stream ceiling reached"
                    );
                }
                Err(e) => {
                    timer.finish(Outcome::Error);
                    log_failure(e);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Direct current-conditions lookup for one coordinate
    pub async fn current_weather(&self, coord: Coordinate) -> Result<CurrentConditions> {
        self.weather.current(coord).await
    }
}

/// Only generation failures are unexpected; everything else is the
/// caller's input or an upstream being down.
fn log_failure(err: &AdvisorError) {
    match err.kind() {
        ErrorKind::Generation | ErrorKind::NoResponse => {
            error!(code = err.code(), city = err.city(), "Failed: {err}");
        }
        _ => warn!(code = err.code(), city = err.city(), "Failed: {err}"),
    }
}
