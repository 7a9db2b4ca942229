pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::search::{HealthChecker, SearchService};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub health: Option<HealthChecker>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(search: Arc<SearchService>) -> Self {
        Self {
            search,
            health: None,
            started_at: Instant::now(),
        }
    }

    /// Set the store health checker used by the readiness probe
    pub fn with_health(mut self, health: HealthChecker) -> Self {
        self.health = Some(health);
        self
    }
}
