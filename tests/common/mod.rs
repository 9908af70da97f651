//! In-memory browser used by the integration tests. Pages are canned HTML;
//! the pagination control advances the surface to the next canned page.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use review_harvester::core::config::HarvestConfig;
use review_harvester::cookies::CookieDescriptor;
use review_harvester::harvest::retry::RetryPolicy;
use review_harvester::harvest::surface::{
    FrameRef, NavigationDeadline, ReviewSurface, SessionIdentity, SessionLauncher, StorefrontSession,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DENIAL_PAGE: &str =
    "<html><body><h2>현재 서비스 접속이 불가합니다.</h2><p>잠시 후 다시 시도해 주세요.</p></body></html>";

pub fn card(nickname: &str, date: &str, content: &str) -> String {
    format!(
        r#"<li class="IwcuBUIAKf">
  <div class="Db9Dtnf7gY"><strong>{nickname}</strong><span>{date}</span></div>
  <em class="n6zq2yy0KA">5</em>
  <div class="b_caIle8kC">색상: 블랙</div>
  <div class="KqJ8Qqw082"><span>{content}</span></div>
</li>"#
    )
}

pub fn page(cards: &[String], page_count: usize) -> String {
    let links: String = (1..=page_count).map(|n| format!("<a>{n}</a>")).collect();
    format!(
        r#"<html><body><ul>{}</ul><div class="LiT9lKOVbw">{}</div></body></html>"#,
        cards.join("\n"),
        links
    )
}

/// Page 1: r1..r5. Page 2: r5 again, then r6..r9.
pub fn two_overlapping_pages() -> Vec<String> {
    let r = |i: usize| card(&format!("user{i}"), "24.11.05.", &format!("리뷰 본문 {i}번 입니다"));
    let p1: Vec<String> = (1..=5).map(r).collect();
    let p2: Vec<String> = (5..=9).map(r).collect();
    vec![page(&p1, 2), page(&p2, 2)]
}

pub struct FakeSurface {
    name: String,
    pages: Vec<String>,
    current: AtomicUsize,
    /// Served by `html()` before the canned pages; `Err` simulates a detached frame.
    scripted: Mutex<VecDeque<std::result::Result<String, String>>>,
    pub html_reads: AtomicU32,
    pub clicked: Mutex<Vec<String>>,
}

impl FakeSurface {
    pub fn new(name: &str, pages: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            pages,
            current: AtomicUsize::new(0),
            scripted: Mutex::new(VecDeque::new()),
            html_reads: AtomicU32::new(0),
            clicked: Mutex::new(Vec::new()),
        })
    }

    pub fn script(self: &Arc<Self>, responses: Vec<std::result::Result<&str, &str>>) -> Arc<Self> {
        let mut q = self.scripted.lock().unwrap();
        for r in responses {
            q.push_back(r.map(str::to_string).map_err(str::to_string));
        }
        drop(q);
        Arc::clone(self)
    }
}

#[async_trait]
impl ReviewSurface for FakeSurface {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn html(&self) -> Result<String> {
        self.html_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.scripted.lock().unwrap().pop_front() {
            return next.map_err(|e| anyhow!(e));
        }
        let i = self.current.load(Ordering::SeqCst);
        Ok(self.pages.get(i).cloned().unwrap_or_default())
    }

    async fn scroll_by(&self, _dy: i64) -> Result<()> {
        Ok(())
    }

    async fn click_labeled(&self, _region: &str, _link: &str, label: &str) -> Result<bool> {
        self.clicked.lock().unwrap().push(label.to_string());
        let Ok(n) = label.parse::<usize>() else {
            return Ok(false);
        };
        let current = self.current.load(Ordering::SeqCst);
        if n == current + 2 && n <= self.pages.len() {
            self.current.store(n - 1, Ordering::SeqCst);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Goto {
    Ok,
    Fail,
    Hang,
    /// The driver gives up after 30 s, well inside the harvest's own budget.
    DriverDeadline,
}

pub struct FakeSession {
    pub top: Arc<FakeSurface>,
    pub review: Option<Arc<FakeSurface>>,
    pub tab_visible: bool,
    pub goto: Goto,
    pub closed: Arc<AtomicBool>,
}

impl FakeSession {
    /// Product page with a review tab and an embedded review frame.
    pub fn with_frame(review: Arc<FakeSurface>) -> Self {
        Self {
            top: FakeSurface::new("top-level", vec![page(&[], 0)]),
            review: Some(review),
            tab_visible: true,
            goto: Goto::Ok,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl StorefrontSession for FakeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        match self.goto {
            Goto::Ok => Ok(()),
            Goto::Fail => Err(anyhow!("net::ERR_NAME_NOT_RESOLVED at {url}")),
            Goto::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Goto::DriverDeadline => {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                Err(NavigationDeadline {
                    url: url.to_string(),
                }
                .into())
            }
        }
    }

    async fn is_visible(&self, _selector: &str) -> Result<bool> {
        Ok(self.tab_visible)
    }

    async fn click(&self, _selector: &str) -> Result<bool> {
        Ok(self.tab_visible)
    }

    async fn wheel(&self, _dy: i64) -> Result<()> {
        Ok(())
    }

    async fn frames(&self) -> Result<Vec<FrameRef>> {
        Ok(self
            .review
            .iter()
            .map(|_| FrameRef {
                id: "review".to_string(),
                url: "https://shopping.pstatic.net/review/widget?productNo=1".to_string(),
            })
            .collect())
    }

    fn top_level(&self) -> Arc<dyn ReviewSurface> {
        self.top.clone()
    }

    fn frame_surface(&self, _frame: &FrameRef) -> Arc<dyn ReviewSurface> {
        match &self.review {
            Some(r) => r.clone(),
            None => self.top.clone(),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one prepared session.
pub struct FakeLauncher {
    session: Mutex<Option<FakeSession>>,
    pub opened: Arc<AtomicU32>,
    pub cookies_seen: Arc<Mutex<Vec<CookieDescriptor>>>,
}

impl FakeLauncher {
    pub fn new(session: FakeSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            opened: Arc::new(AtomicU32::new(0)),
            cookies_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A launcher whose browser never starts.
    pub fn broken() -> Self {
        Self {
            session: Mutex::new(None),
            opened: Arc::new(AtomicU32::new(0)),
            cookies_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn open(
        &self,
        _identity: &SessionIdentity,
        cookies: &[CookieDescriptor],
    ) -> Result<Box<dyn StorefrontSession>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.cookies_seen.lock().unwrap().extend_from_slice(cookies);
        let session = self
            .session
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow!("Failed to launch browser (fake): no executable"))?;
        Ok(Box::new(session))
    }
}

/// Defaults with short polling budgets; delays still run on the paused clock.
pub fn test_config() -> HarvestConfig {
    let mut cfg = HarvestConfig::default();
    cfg.frame.tab_poll = RetryPolicy::fixed(3, 200);
    cfg.frame.frame_poll = RetryPolicy::fixed(3, 250);
    cfg.pagination.scroll_steps = 2;
    cfg
}
