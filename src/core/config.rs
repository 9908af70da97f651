use crate::core::error::ConfigError;
use crate::harvest::markup::MarkupContract;
use crate::harvest::retry::RetryPolicy;
use crate::harvest::surface::SessionIdentity;
use crate::types::RatingPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// HarvestConfig: file-based config loader (review-harvester.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Browser session settings.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(flatten)]
    pub identity: SessionIdentity,
    /// `None` → `HARVEST_HEADLESS` env var → `true`.
    pub headless: Option<bool>,
    /// Upper bound for the initial navigation. Exceeding it is not fatal.
    pub navigation_timeout_ms: u64,
    /// Grace period after navigation before the first inspection.
    pub post_navigation_wait_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity: SessionIdentity::default(),
            headless: None,
            navigation_timeout_ms: 120_000,
            post_navigation_wait_ms: 2_000,
        }
    }
}

impl SessionConfig {
    /// Headless: JSON field → `HARVEST_HEADLESS` env var → `true`.
    pub fn resolve_headless(&self) -> bool {
        if let Some(h) = self.headless {
            return h;
        }
        match std::env::var(ENV_HEADLESS) {
            Ok(v) => !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            ),
            Err(_) => true,
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn post_navigation_wait(&self) -> Duration {
        Duration::from_millis(self.post_navigation_wait_ms)
    }
}

/// Review tab / frame discovery budgets.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct FrameConfig {
    pub tab_poll: RetryPolicy,
    /// Pixels scrolled between tab probes.
    pub tab_wheel_px: i64,
    pub frame_poll: RetryPolicy,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            tab_poll: RetryPolicy::fixed(50, 200),
            tab_wheel_px: 800,
            frame_poll: RetryPolicy::fixed(80, 250),
        }
    }
}

/// Lazy-load scrolling and page-advance timing.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PaginationConfig {
    pub scroll_steps: u32,
    pub scroll_px: i64,
    pub scroll_delay_ms: u64,
    /// Wait after clicking a page link before reading the next page.
    pub settle_delay_ms: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            scroll_steps: 12,
            scroll_px: 800,
            scroll_delay_ms: 250,
            settle_delay_ms: 2_000,
        }
    }
}

/// Top-level config loaded from `review-harvester.json`.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HarvestConfig {
    pub session: SessionConfig,
    pub frame: FrameConfig,
    pub pagination: PaginationConfig,
    /// Pause before re-checking a blocked surface.
    pub block_recovery_ms: u64,
    /// Content characters that take part in the dedup fingerprint.
    pub dedup_prefix_chars: usize,
    pub rating: RatingPolicy,
    pub markup: MarkupContract,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            frame: FrameConfig::default(),
            pagination: PaginationConfig::default(),
            block_recovery_ms: 30_000,
            dedup_prefix_chars: crate::harvest::dedup::DEFAULT_PREFIX_CHARS,
            rating: RatingPolicy::default(),
            markup: MarkupContract::default(),
        }
    }
}

impl HarvestConfig {
    pub fn block_recovery(&self) -> Duration {
        Duration::from_millis(self.block_recovery_ms)
    }

    /// Parse and validate a config document.
    pub fn from_json(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let cfg: HarvestConfig =
            serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        cfg.markup.validate()?;
        Ok(cfg)
    }

    /// Strict variant of [`load_harvest_config`] for an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(path, &contents)
    }
}

fn config_candidates() -> Vec<PathBuf> {
    let mut v = vec![
        PathBuf::from("review-harvester.json"),
        PathBuf::from("../review-harvester.json"),
    ];
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".review-harvester").join("config.json"));
    }
    if let Ok(env_path) = std::env::var(ENV_CONFIG) {
        v.insert(0, PathBuf::from(env_path));
    }
    v
}

/// Load `review-harvester.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `REVIEW_HARVESTER_CONFIG` env var path
/// 2. `./review-harvester.json`
/// 3. `../review-harvester.json`
/// 4. `~/.review-harvester/config.json`
///
/// Missing file → `HarvestConfig::default()`.
/// Parse or selector error → log a warning, return `HarvestConfig::default()`.
pub fn load_harvest_config() -> HarvestConfig {
    for path in config_candidates() {
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        return match HarvestConfig::from_json(&path, &contents) {
            Ok(cfg) => {
                tracing::info!("review-harvester config loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                HarvestConfig::default()
            }
        };
    }
    HarvestConfig::default()
}

// ---------------------------------------------------------------------------

pub const ENV_CONFIG: &str = "REVIEW_HARVESTER_CONFIG";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_HEADLESS: &str = "HARVEST_HEADLESS";
pub const ENV_CONCURRENCY: &str = "HARVEST_CONCURRENCY";

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is **auto-discovery** (see `scraping::browser_manager::find_chrome_executable()`).
/// Only returns a value when `CHROME_EXECUTABLE` is set to an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}

/// Simultaneous browser sessions the HTTP service allows. Default: 2.
pub fn harvest_concurrency() -> usize {
    std::env::var(ENV_CONCURRENCY)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(2)
}
