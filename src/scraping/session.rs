//! `chromiumoxide`-backed implementation of the harvest surface traits.
//!
//! One [`CdpSession`] is one browser process with one tab. Embedded frames are
//! reached through `Page.getFrameTree` and evaluated in an isolated world
//! created for the frame, so page scripts cannot observe the harvester.

use super::browser_manager::{
    build_session_config, driver_request_timeout, find_chrome_executable,
};
use super::stealth::stealth_script;
use crate::core::config::SessionConfig;
use crate::features::cookies::CookieDescriptor;
use crate::harvest::surface::{
    FrameRef, NavigationDeadline, ReviewSurface, SessionIdentity, SessionLauncher,
    StorefrontSession,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetLocaleOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, SetCookiesParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CreateIsolatedWorldParams, FrameId, FrameTree,
    GetFrameTreeParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, ExecutionContextId};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const WORLD_NAME: &str = "review-harvester";

/// Launches one fresh browser per harvest.
pub struct ChromeLauncher {
    headless: bool,
    executable: Option<String>,
    request_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            executable: None,
            request_timeout: driver_request_timeout(&SessionConfig::default()),
        }
    }

    pub fn from_config(session: &SessionConfig) -> Self {
        Self {
            request_timeout: driver_request_timeout(session),
            ..Self::new(session.resolve_headless())
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_executable(mut self, exe: impl Into<String>) -> Self {
        self.executable = Some(exe.into());
        self
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn open(
        &self,
        identity: &SessionIdentity,
        cookies: &[CookieDescriptor],
    ) -> Result<Box<dyn StorefrontSession>> {
        let exe = self
            .executable
            .clone()
            .or_else(find_chrome_executable)
            .ok_or_else(|| {
                anyhow!("No browser found. Install Chrome or Chromium, or set CHROME_EXECUTABLE.")
            })?;

        info!(
            "🚀 launching browser ({}, {})",
            exe,
            if self.headless { "headless" } else { "headed" }
        );
        let config = build_session_config(&exe, identity, self.headless, self.request_timeout)?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser ({}): {}", exe, e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler error: {}", e);
                }
            }
        });

        let page = match open_prepared_page(&browser, identity, cookies).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("Browser close error (non-fatal): {}", close_err);
                }
                handler_task.abort();
                return Err(e);
            }
        };

        Ok(Box::new(CdpSession {
            browser: Some(browser),
            page,
            identity: identity.clone(),
            handler_task: Some(handler_task),
        }))
    }
}

/// Blank tab with identity, stealth script and cookies applied, ready for
/// the first navigation.
async fn open_prepared_page(
    browser: &Browser,
    identity: &SessionIdentity,
    cookies: &[CookieDescriptor],
) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| anyhow!("Failed to create page: {}", e))?;

    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(stealth_script(
        &identity.locale,
    )))
    .await
    .map_err(|e| anyhow!("Failed to inject stealth script: {}", e))?;

    let mut ua = SetUserAgentOverrideParams::new(identity.user_agent.clone());
    ua.accept_language = Some(identity.locale.clone());
    page.execute(ua)
        .await
        .map_err(|e| anyhow!("Failed to override user agent: {}", e))?;

    if let Err(e) = page
        .execute(SetLocaleOverrideParams {
            locale: Some(identity.locale.clone()),
        })
        .await
    {
        warn!("locale override rejected (non-fatal): {}", e);
    }

    if !cookies.is_empty() {
        let params: Vec<CookieParam> = cookies
            .iter()
            .filter_map(|c| serde_json::from_value::<CookieParam>(c.to_cdp_json()).ok())
            .collect();
        if params.len() < cookies.len() {
            warn!(
                "{} cookie(s) could not be converted to CDP form",
                cookies.len() - params.len()
            );
        }
        let n = params.len();
        page.execute(SetCookiesParams::new(params))
            .await
            .map_err(|e| anyhow!("Failed to set cookies: {}", e))?;
        info!("🍪 injected {} cookie(s)", n);
    }

    Ok(page)
}

pub struct CdpSession {
    browser: Option<Browser>,
    page: Page,
    identity: SessionIdentity,
    handler_task: Option<JoinHandle<()>>,
}

fn collect_frames(tree: &FrameTree, out: &mut Vec<FrameRef>) {
    for child in tree.child_frames.iter().flatten() {
        out.push(FrameRef {
            id: child.frame.id.inner().clone(),
            url: child.frame.url.clone(),
        });
        collect_frames(child, out);
    }
}

/// `Runtime.evaluate` with the value returned by value. Scripts here are
/// plain expressions, never function declarations.
async fn evaluate_value(
    page: &Page,
    expression: String,
    context: Option<ExecutionContextId>,
) -> Result<Value> {
    let mut builder = EvaluateParams::builder()
        .expression(expression)
        .return_by_value(true)
        .await_promise(true);
    if let Some(id) = context {
        builder = builder.context_id(id);
    }
    let params = builder
        .build()
        .map_err(|e| anyhow!("invalid evaluate params: {}", e))?;
    let resp = page
        .execute(params)
        .await
        .map_err(|e| anyhow!("evaluate failed: {}", e))?;
    if let Some(ex) = &resp.result.exception_details {
        return Err(anyhow!("script error: {}", ex.text));
    }
    Ok(resp.result.result.value.clone().unwrap_or(Value::Null))
}

/// JSON string literal for embedding `s` in a script.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl StorefrontSession for CdpSession {
    async fn goto(&self, url: &str) -> Result<()> {
        match self.page.goto(url).await {
            Ok(_) => Ok(()),
            Err(CdpError::Timeout) => Err(NavigationDeadline {
                url: url.to_string(),
            }
            .into()),
            Err(e) => Err(anyhow!("Failed to navigate: {}", e)),
        }
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let js = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             const r = el.getBoundingClientRect(); return r.width > 0 && r.height > 0; }})()",
            js_str(selector)
        );
        let v = evaluate_value(&self.page, js, None).await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let Ok(el) = self.page.find_element(selector).await else {
            return Ok(false);
        };
        el.scroll_into_view()
            .await
            .map_err(|e| anyhow!("scroll into view failed: {}", e))?;
        el.click()
            .await
            .map_err(|e| anyhow!("click failed: {}", e))?;
        Ok(true)
    }

    async fn wheel(&self, dy: i64) -> Result<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseWheel)
            .x(f64::from(self.identity.viewport_width) / 2.0)
            .y(f64::from(self.identity.viewport_height) / 2.0)
            .delta_x(0.0)
            .delta_y(dy as f64)
            .build()
            .map_err(|e| anyhow!("invalid wheel event: {}", e))?;
        self.page
            .execute(params)
            .await
            .map_err(|e| anyhow!("wheel failed: {}", e))?;
        Ok(())
    }

    async fn frames(&self) -> Result<Vec<FrameRef>> {
        let tree = self
            .page
            .execute(GetFrameTreeParams::default())
            .await
            .map_err(|e| anyhow!("Page.getFrameTree failed: {}", e))?;
        let mut frames = Vec::new();
        collect_frames(&tree.result.frame_tree, &mut frames);
        Ok(frames)
    }

    fn top_level(&self) -> Arc<dyn ReviewSurface> {
        Arc::new(CdpSurface {
            page: self.page.clone(),
            frame: None,
        })
    }

    fn frame_surface(&self, frame: &FrameRef) -> Arc<dyn ReviewSurface> {
        Arc::new(CdpSurface {
            page: self.page.clone(),
            frame: Some(FrameWorld {
                id: FrameId::new(frame.id.clone()),
                url: frame.url.clone(),
                context: Mutex::new(None),
            }),
        })
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            debug!("browser wait failed: {}", e);
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        closed.map_err(|e| anyhow!("Failed to close browser: {}", e))?;
        info!("🛑 browser closed");
        Ok(())
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        // Drop cannot await; hand the close to the runtime if one is running.
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let task = self.handler_task.take();
        handle.spawn(async move {
            let _ = browser.close().await;
            if let Some(task) = task {
                task.abort();
            }
        });
    }
}

struct FrameWorld {
    id: FrameId,
    url: String,
    /// Isolated world, created on first use and dropped when it goes stale.
    context: Mutex<Option<ExecutionContextId>>,
}

/// The top-level document (`frame: None`) or one embedded frame.
pub struct CdpSurface {
    page: Page,
    frame: Option<FrameWorld>,
}

impl CdpSurface {
    async fn eval(&self, js: String) -> Result<Value> {
        let Some(frame) = &self.frame else {
            return evaluate_value(&self.page, js, None).await;
        };

        let mut ctx = frame.context.lock().await;
        let context_id = match ctx.as_ref() {
            Some(id) => id.clone(),
            None => {
                let mut params = CreateIsolatedWorldParams::new(frame.id.clone());
                params.world_name = Some(WORLD_NAME.to_string());
                let created = self
                    .page
                    .execute(params)
                    .await
                    .map_err(|e| anyhow!("frame {} is gone: {}", frame.url, e))?;
                let id = created.result.execution_context_id.clone();
                *ctx = Some(id.clone());
                id
            }
        };

        match evaluate_value(&self.page, js, Some(context_id)).await {
            Ok(v) => Ok(v),
            Err(e) => {
                // Navigation inside the frame invalidates the world.
                *ctx = None;
                Err(anyhow!("{}: {:#}", frame.url, e))
            }
        }
    }
}

#[async_trait]
impl ReviewSurface for CdpSurface {
    fn describe(&self) -> String {
        match &self.frame {
            Some(f) => format!("frame {}", f.url),
            None => "top-level page".to_string(),
        }
    }

    async fn html(&self) -> Result<String> {
        if self.frame.is_none() {
            return self
                .page
                .content()
                .await
                .map_err(|e| anyhow!("Failed to get page content: {}", e));
        }
        let v = self
            .eval("document.documentElement ? document.documentElement.outerHTML : ''".to_string())
            .await?;
        v.as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("frame returned no markup"))
    }

    async fn scroll_by(&self, dy: i64) -> Result<()> {
        self.eval(format!("window.scrollBy(0, {dy}); true")).await?;
        Ok(())
    }

    async fn click_labeled(
        &self,
        region_selector: &str,
        link_selector: &str,
        label: &str,
    ) -> Result<bool> {
        let js = format!(
            "(() => {{ const region = document.querySelector({region}); if (!region) return false; \
             const target = Array.from(region.querySelectorAll({link})) \
               .find(el => (el.textContent || '').trim() === {label}); \
             if (!target) return false; \
             target.scrollIntoView({{block: 'center'}}); target.click(); return true; }})()",
            region = js_str(region_selector),
            link = js_str(link_selector),
            label = js_str(label),
        );
        Ok(self.eval(js).await?.as_bool().unwrap_or(false))
    }
}
