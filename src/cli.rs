//! Shared plumbing for the command-line front ends.

use crate::core::config::{load_harvest_config, HarvestConfig};
use crate::core::error::{ErrorKind, HarvestError};
use crate::features::cookies::load_cookie_file;
use crate::harvest::orchestrator::{HarvestOrchestrator, HarvestRequest};
use crate::scraping::ChromeLauncher;
use crate::types::HarvestReport;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct HarvestArgs {
    /// Product page URL
    pub url: String,

    /// Maximum number of review pages to read
    #[arg(long, short = 'p', default_value_t = 3)]
    pub pages: u32,

    /// Cookie export (JSON array or {"cookies": [...]}) for a logged-in session
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Config file; skips the standard search locations
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl HarvestArgs {
    fn load_config(&self) -> anyhow::Result<HarvestConfig> {
        match &self.config {
            Some(path) => Ok(HarvestConfig::load_from(path)?),
            None => Ok(load_harvest_config()),
        }
    }
}

/// Exit status for a fatal harvest error.
pub fn exit_code(err: &HarvestError) -> i32 {
    match err.kind() {
        ErrorKind::InvalidRequest => 2,
        ErrorKind::AccessBlocked => 3,
        _ => 1,
    }
}

/// Why a CLI run stopped early.
#[derive(Debug)]
pub enum RunError {
    Setup(anyhow::Error),
    Harvest(HarvestError),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Setup(_) => 2,
            RunError::Harvest(e) => exit_code(e),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Setup(e) => write!(f, "{:#}", e),
            RunError::Harvest(e) => write!(f, "{} ({:?})", e, e.kind()),
        }
    }
}

/// Load config and cookies, then run one harvest with a local browser.
pub async fn run_harvest(args: &HarvestArgs) -> Result<HarvestReport, RunError> {
    let config = args.load_config().map_err(RunError::Setup)?;
    let cookies = match &args.cookies {
        Some(path) => load_cookie_file(path).map_err(RunError::Setup)?,
        None => Vec::new(),
    };

    let headless = !args.headed && config.session.resolve_headless();
    let orchestrator = HarvestOrchestrator::new(
        ChromeLauncher::from_config(&config.session).with_headless(headless),
        Arc::new(config),
    )
        .map_err(|e| RunError::Setup(e.into()))?;
    let request = HarvestRequest::new(args.url.clone(), args.pages).with_cookies(cookies);
    orchestrator.harvest(&request).await.map_err(RunError::Harvest)
}
