//! Browser seams used by the harvest engine.
//!
//! The engine never talks to CDP directly: it drives a [`StorefrontSession`]
//! (one tab) and the [`ReviewSurface`]s it hands out (the top-level document
//! or one embedded frame). `scraping::session` implements these over
//! chromiumoxide; tests implement them over canned HTML.

use crate::features::cookies::CookieDescriptor;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An embedded frame as reported by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRef {
    pub id: String,
    pub url: String,
}

/// A document that can host review cards.
#[async_trait]
pub trait ReviewSurface: Send + Sync {
    /// Short label for logs (frame URL or "top-level").
    fn describe(&self) -> String;

    /// Serialized markup of the surface as currently rendered.
    async fn html(&self) -> Result<String>;

    /// Scroll the surface's own viewport by `dy` pixels.
    async fn scroll_by(&self, dy: i64) -> Result<()>;

    /// Click the first `link_selector` element inside `region_selector` whose
    /// trimmed text equals `label`. `Ok(false)` when no such control exists.
    async fn click_labeled(&self, region_selector: &str, link_selector: &str, label: &str)
        -> Result<bool>;
}

/// Error a session's `goto` returns when the browser driver stopped waiting
/// for the load. Whatever rendered so far is still on the page.
#[derive(Debug, thiserror::Error)]
#[error("driver deadline passed while loading {url}")]
pub struct NavigationDeadline {
    pub url: String,
}

/// One tab in one browsing context.
#[async_trait]
pub trait StorefrontSession: Send + Sync {
    /// Navigate the tab. A driver-side load timeout is reported as
    /// [`NavigationDeadline`] so callers can tell it from a failed request.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Whether an element matching `selector` is rendered with a non-empty box.
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Scroll `selector` into view and click it. `Ok(false)` when absent.
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Mouse-wheel style scroll of the top-level document.
    async fn wheel(&self, dy: i64) -> Result<()>;

    /// Embedded frames, excluding the main frame.
    async fn frames(&self) -> Result<Vec<FrameRef>>;

    fn top_level(&self) -> Arc<dyn ReviewSurface>;

    fn frame_surface(&self, frame: &FrameRef) -> Arc<dyn ReviewSurface>;

    /// Release the browser. Must be safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Identity every session presents to the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionIdentity {
    pub user_agent: String,
    pub locale: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36".to_string(),
            locale: "ko-KR".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Opens sessions. The orchestrator owns what it opens and closes it on every
/// exit path.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn open(
        &self,
        identity: &SessionIdentity,
        cookies: &[CookieDescriptor],
    ) -> Result<Box<dyn StorefrontSession>>;
}
