use crate::core::config::{harvest_concurrency, HarvestConfig};
use crate::core::error::ConfigError;
use crate::harvest::orchestrator::HarvestOrchestrator;
use crate::harvest::surface::SessionLauncher;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared state of the HTTP service.
pub struct AppState<L> {
    pub orchestrator: Arc<HarvestOrchestrator<L>>,
    /// Bounds simultaneous browser sessions. Each permit is one Chromium process.
    pub session_limit: Arc<Semaphore>,
    /// Config file loaded at startup (defaults when none was found).
    pub config: Arc<HarvestConfig>,
}

impl<L> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            session_limit: Arc::clone(&self.session_limit),
            config: Arc::clone(&self.config),
        }
    }
}

impl<L> std::fmt::Debug for AppState<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("markup_version", &self.config.markup.version)
            .field("free_sessions", &self.session_limit.available_permits())
            .finish()
    }
}

impl<L: SessionLauncher> AppState<L> {
    /// Session limit from `HARVEST_CONCURRENCY` (default 2).
    pub fn new(launcher: L, config: HarvestConfig) -> Result<Self, ConfigError> {
        Self::with_session_limit(launcher, config, harvest_concurrency())
    }

    pub fn with_session_limit(
        launcher: L,
        config: HarvestConfig,
        sessions: usize,
    ) -> Result<Self, ConfigError> {
        let config = Arc::new(config);
        let orchestrator = HarvestOrchestrator::new(launcher, Arc::clone(&config))?;
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            session_limit: Arc::new(Semaphore::new(sessions.max(1))),
            config,
        })
    }
}
