//! Application State

use std::sync::Arc;

use advisor_core::{AdvisorMetrics, LlmProvider};
use weather_advisor::AdviceOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AdviceOrchestrator>,

    /// Generation backend, also held by the orchestrator; kept here for
    /// health checks
    pub provider: Arc<dyn LlmProvider>,

    /// Process-scoped metrics handle
    pub metrics: Arc<AdvisorMetrics>,
}
