//! One harvest, start to finish.
//!
//! Opens a session, navigates, screens for the denial page, locates the review
//! surface, then walks pages collecting unique records. The session is closed
//! on every exit path, including fatal ones.

use super::block::{BlockDetector, BlockStatus};
use super::card_parser::{CardParser, ParsedCard};
use super::dedup::{Admission, DedupTracker};
use super::frame_locator::FrameLocator;
use super::pagination::{PaginationController, Step};
use super::surface::{NavigationDeadline, ReviewSurface, SessionLauncher, StorefrontSession};
use crate::core::config::HarvestConfig;
use crate::core::error::{ConfigError, HarvestError};
use crate::features::cookies::CookieDescriptor;
use crate::types::{
    CardPosition, DuplicateHit, HarvestReport, HarvestWarning, ReviewRecord, Termination,
};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct HarvestRequest {
    pub url: String,
    pub page_limit: u32,
    pub cookies: Vec<CookieDescriptor>,
}

impl HarvestRequest {
    pub fn new(url: impl Into<String>, page_limit: u32) -> Self {
        Self {
            url: url.into(),
            page_limit,
            cookies: Vec::new(),
        }
    }

    pub fn with_cookies(mut self, cookies: Vec<CookieDescriptor>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| HarvestError::InvalidRequest(format!("{:?} is not a URL: {}", self.url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HarvestError::InvalidRequest(format!(
                "unsupported scheme {:?}",
                parsed.scheme()
            )));
        }
        if self.page_limit == 0 {
            return Err(HarvestError::InvalidRequest(
                "page limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of screening one snapshot for the denial page.
enum Screen {
    Clear(String),
    /// The surface could not be re-read after the recovery pause.
    Lost(anyhow::Error),
}

/// Accumulates the outputs of the page loop.
#[derive(Default)]
struct Collected {
    reviews: Vec<ReviewRecord>,
    duplicates: Vec<DuplicateHit>,
    warnings: Vec<HarvestWarning>,
}

pub struct HarvestOrchestrator<L> {
    launcher: L,
    config: Arc<HarvestConfig>,
    parser: CardParser,
    blocks: BlockDetector,
}

impl<L: SessionLauncher> HarvestOrchestrator<L> {
    pub fn new(launcher: L, config: Arc<HarvestConfig>) -> Result<Self, ConfigError> {
        let parser = CardParser::new(&config.markup, config.rating)?;
        let blocks = BlockDetector::new(config.markup.block_signatures.iter().cloned());
        Ok(Self {
            launcher,
            config,
            parser,
            blocks,
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Harvest unique reviews from up to `page_limit` pages of `url`.
    ///
    /// Fatal errors (`AccessBlocked`, `SessionError`, `NavigationFailed`,
    /// `InvalidRequest`) return no records. Everything else degrades into
    /// [`HarvestReport::warnings`].
    pub async fn harvest(&self, request: &HarvestRequest) -> Result<HarvestReport, HarvestError> {
        request.validate()?;

        let run_id = Uuid::new_v4();
        let span = info_span!("harvest", run_id = %run_id, url = %request.url);
        async {
            info!(
                "🛒 harvest start: up to {} page(s), {} cookie(s), markup {}",
                request.page_limit,
                request.cookies.len(),
                self.config.markup.version
            );
            let mut session = self
                .launcher
                .open(&self.config.session.identity, &request.cookies)
                .await
                .map_err(|e| HarvestError::Session(format!("{:#}", e)))?;

            let outcome = self.drive(session.as_ref(), request).await;

            if let Err(e) = session.close().await {
                warn!("session close failed: {:#}", e);
            }
            match &outcome {
                Ok(report) => info!(
                    "✅ harvest done: {} review(s) over {} page(s), {:?}",
                    report.count, report.pages_visited, report.termination
                ),
                Err(e) => warn!("❌ harvest failed ({:?}): {}", e.kind(), e),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        session: &dyn StorefrontSession,
        request: &HarvestRequest,
    ) -> Result<HarvestReport, HarvestError> {
        let cfg = &*self.config;
        let mut out = Collected::default();

        let timed_out =
            match tokio::time::timeout(cfg.session.navigation_timeout(), session.goto(&request.url))
                .await
            {
                Ok(Ok(())) => {
                    info!("🌐 navigated");
                    false
                }
                Ok(Err(e)) if e.is::<NavigationDeadline>() => {
                    warn!("{:#}", e);
                    true
                }
                Ok(Err(e)) => return Err(HarvestError::NavigationFailed(format!("{:#}", e))),
                Err(_) => true,
            };
        if timed_out {
            let err = HarvestError::NavigationTimeout {
                timeout_ms: cfg.session.navigation_timeout_ms,
            };
            warn!("{}, continuing with what rendered", err);
            out.warnings.push(HarvestWarning::from(&err));
        }
        tokio::time::sleep(cfg.session.post_navigation_wait()).await;

        let top = session.top_level();
        let html = top.html().await.map_err(|e| {
            HarvestError::Session(format!("top-level document unreadable: {:#}", e))
        })?;
        if let Screen::Lost(e) = self.screen(top.as_ref(), html).await? {
            return Err(HarvestError::Session(format!(
                "top-level document lost during block recovery: {:#}",
                e
            )));
        }

        let located = FrameLocator::new(&cfg.markup, &cfg.frame)
            .locate(session)
            .await;
        if let Some(err) = &located.fallback {
            out.warnings.push(HarvestWarning::from(err));
        }
        let surface = located.surface;

        let mut pager = PaginationController::new(&cfg.pagination, &cfg.markup, request.page_limit);
        let mut dedup = DedupTracker::new(cfg.dedup_prefix_chars);

        let termination = loop {
            let page = pager.page();
            pager.prepare(surface.as_ref()).await;

            let html = match surface.html().await {
                Ok(html) => html,
                Err(e) => {
                    warn!("{} unreadable on page {}: {:#}", surface.describe(), page, e);
                    break pager.finish(Termination::SurfaceLost);
                }
            };
            let html = match self.screen(surface.as_ref(), html).await? {
                Screen::Clear(html) => html,
                Screen::Lost(e) => {
                    warn!("{} lost after block recovery: {:#}", surface.describe(), e);
                    break pager.finish(Termination::SurfaceLost);
                }
            };

            let cards = self.parser.extract_cards(&html);
            if cards.is_empty() {
                info!("page {} rendered no review cards", page);
                break pager.finish(Termination::NoCards);
            }
            let total = cards.len();
            let fresh = self.collect(page, cards, &mut dedup, &mut out);
            info!(
                "📄 page {}: {} card(s), {} new, {} duplicate",
                page,
                total,
                fresh,
                total - fresh
            );

            match pager.advance(surface.as_ref()).await {
                Step::Next(_) => continue,
                Step::Done(t) => break t,
            }
        };

        Ok(HarvestReport {
            url: request.url.clone(),
            count: out.reviews.len(),
            reviews: out.reviews,
            pages_visited: pager.page(),
            termination,
            surface: located.origin,
            warnings: out.warnings,
            duplicates: out.duplicates,
            harvested_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Fold one page of cards into the run. Returns how many were new.
    fn collect(
        &self,
        page: u32,
        cards: Vec<ParsedCard>,
        dedup: &mut DedupTracker,
        out: &mut Collected,
    ) -> usize {
        let mut fresh = 0;
        for (i, card) in cards.into_iter().enumerate() {
            let position = CardPosition { page, index: i + 1 };

            let missing: Vec<&str> = card
                .missing
                .iter()
                .filter(|f| f.is_structural())
                .map(|f| f.as_str())
                .collect();
            if !missing.is_empty() {
                let err = HarvestError::ParseFailure {
                    page,
                    index: position.index,
                    missing: missing.join(", "),
                };
                out.warnings.push(HarvestWarning::from(&err));
            }

            match dedup.admit_at(&card.record, position) {
                Admission::Fresh => {
                    fresh += 1;
                    out.reviews.push(card.record);
                }
                Admission::Duplicate { key, first_seen } => out.duplicates.push(DuplicateHit {
                    key: key.to_string(),
                    first_seen: first_seen.unwrap_or(position),
                    repeated_at: position,
                }),
            }
        }
        fresh
    }

    /// On a denial page, wait out the recovery window and look once more.
    async fn screen(&self, surface: &dyn ReviewSurface, html: String) -> Result<Screen, HarvestError> {
        let BlockStatus::Blocked { signature } = self.blocks.classify(&html) else {
            return Ok(Screen::Clear(html));
        };
        warn!(
            "🚫 denial text {:?} on {}, pausing {}ms",
            signature,
            surface.describe(),
            self.config.block_recovery_ms
        );
        tokio::time::sleep(self.config.block_recovery()).await;

        let html = match surface.html().await {
            Ok(html) => html,
            Err(e) => return Ok(Screen::Lost(e)),
        };
        match self.blocks.classify(&html) {
            BlockStatus::Ok => {
                info!("block cleared after recovery pause");
                Ok(Screen::Clear(html))
            }
            BlockStatus::Blocked { signature } => Err(HarvestError::AccessBlocked { signature }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn request_validation() {
        assert!(HarvestRequest::new("https://smartstore.naver.com/shop/products/1", 3)
            .validate()
            .is_ok());

        let cases = [
            HarvestRequest::new("not a url", 1),
            HarvestRequest::new("ftp://example.com/x", 1),
            HarvestRequest::new("https://example.com/x", 0),
        ];
        for req in cases {
            let err = req.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest, "{}", req.url);
        }
    }
}
