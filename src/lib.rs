pub mod cli;
pub mod core;
pub mod features;
pub mod harvest;
pub mod scraping;
pub mod service;

// --- Primary core exports ---
pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::{AppState, ErrorKind, HarvestError};

pub use features::cookies;
pub use harvest::{HarvestOrchestrator, HarvestRequest};
pub use scraping::ChromeLauncher;

/// `RUST_LOG`-style filter, defaulting to `info` with quiet request tracing.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
