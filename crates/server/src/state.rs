use std::sync::Arc;

use harvester_core::{ApiKeyGuard, Config, SanitizedConfig, Scheduler};

/// Shared application state
pub struct AppState {
    config: Arc<Config>,
    guard: ApiKeyGuard,
    scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(config: Arc<Config>, guard: ApiKeyGuard, scheduler: Arc<Scheduler>) -> Self {
        Self {
            config,
            guard,
            scheduler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(self.config.as_ref())
    }

    pub fn guard(&self) -> &ApiKeyGuard {
        &self.guard
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
