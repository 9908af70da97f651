//! Browser discovery and launch configuration for `chromiumoxide`.
//!
//! Every session presents the same identity (see [`SessionIdentity`]); there is
//! no user-agent rotation because the storefront ties its review frame to the
//! identity that loaded the product page.

use crate::core::config::{chrome_executable_override, SessionConfig};
use crate::harvest::surface::SessionIdentity;
use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use std::path::Path;
use std::time::Duration;

// ── Browser executable discovery ─────────────────────────────────────────────

const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "brave-browser",
];

#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];

#[cfg(target_os = "linux")]
const INSTALL_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/local/bin/chromium",
    "/snap/bin/chromium",
];

#[cfg(target_os = "windows")]
const INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const INSTALL_PATHS: &[&str] = &[];

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var
/// 2. PATH scan
/// 3. OS-specific install locations
pub fn find_chrome_executable() -> Option<String> {
    chrome_executable_override()
        .or_else(|| {
            let path_var = std::env::var_os("PATH")?;
            std::env::split_paths(&path_var)
                .flat_map(|dir| PATH_NAMES.iter().map(move |exe| dir.join(exe)))
                .find(|p| p.exists())
                .map(|p| p.to_string_lossy().into_owned())
        })
        .or_else(|| {
            INSTALL_PATHS
                .iter()
                .find(|c| Path::new(c).exists())
                .map(|c| c.to_string())
        })
}

/// Browser flags shared by every harvest session.
///
/// Site isolation is switched off so the cross-origin review frame stays in
/// the page's renderer and can be reached through the page's CDP session.
pub fn session_args(identity: &SessionIdentity) -> Vec<String> {
    let mut args: Vec<String> = [
        "--disable-gpu",
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-background-networking",
        "--disable-sync",
        "--disable-translate",
        "--disable-crash-reporter",
        "--no-first-run",
        "--no-default-browser-check",
        "--mute-audio",
        "--disable-blink-features=AutomationControlled",
        "--disable-features=IsolateOrigins,site-per-process",
        "--disable-site-isolation-trials",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(format!("--user-agent={}", identity.user_agent));
    args.push(format!("--lang={}", identity.locale));
    args
}

/// Headroom added to the navigation budget for chromiumoxide's per-request
/// deadline.
const DRIVER_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// chromiumoxide's per-request deadline. It outlasts the navigation budget so a
/// slow load is cut by the harvest's own timeout, not by the driver.
pub fn driver_request_timeout(session: &SessionConfig) -> Duration {
    session.navigation_timeout() + DRIVER_TIMEOUT_MARGIN
}

/// Build a `BrowserConfig` for one harvest session.
pub fn build_session_config(
    exe: &str,
    identity: &SessionIdentity,
    headless: bool,
    request_timeout: Duration,
) -> Result<BrowserConfig> {
    let (width, height) = (identity.viewport_width, identity.viewport_height);
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width,
            height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(width, height)
        .request_timeout(request_timeout);

    if !headless {
        builder = builder.with_head();
    }
    for arg in session_args(identity) {
        builder = builder.arg(arg);
    }

    builder
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}
