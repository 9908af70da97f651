//! Finds the document that hosts the review cards.
//!
//! Two bounded phases: bring the "reviews" tab into view and click it, then
//! wait for the lazily injected review frame. Either phase giving up falls
//! back to the top-level document; the fallback is reported, never fatal.

use super::markup::MarkupContract;
use super::surface::{ReviewSurface, StorefrontSession};
use crate::core::config::FrameConfig;
use crate::core::error::HarvestError;
use crate::types::{FallbackReason, SurfaceOrigin};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LocatedSurface {
    pub surface: Arc<dyn ReviewSurface>,
    pub origin: SurfaceOrigin,
    /// Set when the locator fell back to the top-level document.
    pub fallback: Option<HarvestError>,
}

impl LocatedSurface {
    fn top_level(session: &dyn StorefrontSession, reason: FallbackReason, detail: String) -> Self {
        Self {
            surface: session.top_level(),
            origin: SurfaceOrigin::TopLevel { reason },
            fallback: Some(HarvestError::SurfaceNotFound(detail)),
        }
    }
}

pub struct FrameLocator<'a> {
    contract: &'a MarkupContract,
    config: &'a FrameConfig,
}

impl<'a> FrameLocator<'a> {
    pub fn new(contract: &'a MarkupContract, config: &'a FrameConfig) -> Self {
        Self { contract, config }
    }

    pub async fn locate(&self, session: &dyn StorefrontSession) -> LocatedSurface {
        if !self.activate_review_tab(session).await {
            warn!(
                "review tab {:?} never became visible, reading top-level page",
                self.contract.review_tab
            );
            return LocatedSurface::top_level(
                session,
                FallbackReason::ReviewTabNotFound,
                format!(
                    "review tab {:?} not visible after {} probes",
                    self.contract.review_tab, self.config.tab_poll.max_attempts
                ),
            );
        }

        let contract = self.contract;
        let found = self
            .config
            .frame_poll
            .poll(|attempt| async move {
                match session.frames().await {
                    Ok(frames) => {
                        let hit = frames
                            .into_iter()
                            .find(|f| contract.matches_review_frame(&f.url));
                        if hit.is_none() {
                            debug!("frame probe #{}: no review frame yet", attempt);
                        }
                        hit
                    }
                    Err(e) => {
                        debug!("frame probe #{} failed: {:#}", attempt, e);
                        None
                    }
                }
            })
            .await;

        match found {
            Some(frame) => {
                info!("review frame located: {}", frame.url);
                LocatedSurface {
                    surface: session.frame_surface(&frame),
                    origin: SurfaceOrigin::EmbeddedFrame { url: frame.url },
                    fallback: None,
                }
            }
            None => {
                warn!("no review frame appeared, reading top-level page");
                LocatedSurface::top_level(
                    session,
                    FallbackReason::FrameNotFound,
                    format!(
                        "no frame matching {:?} after {} probes",
                        self.contract.frame_url_markers, self.config.frame_poll.max_attempts
                    ),
                )
            }
        }
    }

    /// Scroll until the tab is visible, then click it. `false` when the
    /// tab never showed up.
    async fn activate_review_tab(&self, session: &dyn StorefrontSession) -> bool {
        let tab = self.contract.review_tab.as_str();
        let wheel_px = self.config.tab_wheel_px;
        let visible = self
            .config
            .tab_poll
            .poll(|attempt| async move {
                match session.is_visible(tab).await {
                    Ok(true) => return Some(()),
                    Ok(false) => debug!("tab probe #{}: not visible", attempt),
                    Err(e) => debug!("tab probe #{} failed: {:#}", attempt, e),
                }
                if let Err(e) = session.wheel(wheel_px).await {
                    debug!("wheel failed: {:#}", e);
                }
                None
            })
            .await;

        if visible.is_none() {
            return false;
        }
        match session.click(tab).await {
            Ok(true) => info!("review tab clicked"),
            Ok(false) => warn!("review tab vanished before click"),
            Err(e) => warn!("review tab click failed: {:#}", e),
        }
        true
    }
}
