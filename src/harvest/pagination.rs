use super::markup::MarkupContract;
use super::surface::ReviewSurface;
use crate::core::config::PaginationConfig;
use crate::types::Termination;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of [`PaginationController::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Now on this page.
    Next(u32),
    Done(Termination),
}

/// Forward-only walk over pages `1..=limit`.
///
/// The controller never revisits or retries a page number: once a terminal
/// state is reached every further `advance` returns it unchanged.
pub struct PaginationController<'a> {
    config: &'a PaginationConfig,
    region: &'a str,
    link: &'a str,
    limit: u32,
    page: u32,
    finished: Option<Termination>,
}

impl<'a> PaginationController<'a> {
    pub fn new(config: &'a PaginationConfig, contract: &'a MarkupContract, limit: u32) -> Self {
        Self {
            config,
            region: &contract.pagination,
            link: &contract.page_link,
            limit: limit.max(1),
            page: 1,
            finished: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn termination(&self) -> Option<Termination> {
        self.finished
    }

    /// Scroll the surface in fixed steps so lazily rendered cards attach.
    /// Scroll failures are logged and otherwise ignored.
    pub async fn prepare(&self, surface: &dyn ReviewSurface) {
        let delay = Duration::from_millis(self.config.scroll_delay_ms);
        for step in 0..self.config.scroll_steps {
            if let Err(e) = surface.scroll_by(self.config.scroll_px).await {
                debug!("scroll step {} on {} failed: {:#}", step + 1, surface.describe(), e);
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Activate the control labelled with the next ordinal and wait for the
    /// page to settle.
    pub async fn advance(&mut self, surface: &dyn ReviewSurface) -> Step {
        if let Some(t) = self.finished {
            return Step::Done(t);
        }
        if self.page >= self.limit {
            return Step::Done(self.finish(Termination::LimitReached));
        }

        let label = (self.page + 1).to_string();
        match surface.click_labeled(self.region, self.link, &label).await {
            Ok(true) => {
                tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
                self.page += 1;
                info!("➡️ moved to review page {}", self.page);
                Step::Next(self.page)
            }
            Ok(false) => {
                info!("no control labelled {:?}, pagination exhausted", label);
                Step::Done(self.finish(Termination::Exhausted))
            }
            Err(e) => {
                warn!("page link {:?} could not be activated: {:#}", label, e);
                Step::Done(self.finish(Termination::Exhausted))
            }
        }
    }

    /// Stop on a condition observed outside the controller (block, empty
    /// page, lost surface). The first terminal state sticks.
    pub fn finish(&mut self, termination: Termination) -> Termination {
        *self.finished.get_or_insert(termination)
    }
}
