use std::sync::Arc;

use crate::gateway::ResumeGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Backend selected at startup: PostgreSQL when configured, in-memory otherwise.
    pub gateway: Arc<dyn ResumeGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn ResumeGateway>) -> Self {
        Self { gateway }
    }
}
