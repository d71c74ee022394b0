use std::sync::Arc;

use crate::config::Config;
use crate::screening::orchestrator::EvaluationOrchestrator;
use crate::screening::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<EvaluationOrchestrator>,
    /// Live sessions. Nothing outlives the process.
    pub sessions: SessionStore,
    pub config: Config,
}
