//! HTTP front end: `GET /`, `GET /health`, `POST /scrape`.
//!
//! `/scrape` takes either a JSON body or the form fields `url`, `limit_pages`
//! and an optional `cookie_file` upload.

use crate::core::error::{ErrorKind, HarvestError};
use crate::features::cookies::{cookies_from_value, parse_cookie_jar, CookieDescriptor};
use crate::harvest::orchestrator::HarvestRequest;
use crate::harvest::surface::SessionLauncher;
use crate::types::*;
use crate::AppState;
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router<L: SessionLauncher + 'static>(state: AppState<L>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/scrape", post(scrape_handler::<L>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::AccessBlocked => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: &HarvestError) -> ApiError {
    let kind = err.kind();
    (
        status_for(kind),
        Json(ErrorResponse {
            error: err.to_string(),
            kind: Some(kind),
        }),
    )
}

fn invalid(detail: impl Into<String>) -> ApiError {
    api_error(&HarvestError::InvalidRequest(detail.into()))
}

/// A `/scrape` body after decoding, whichever encoding it came in.
struct ScrapeInput {
    url: String,
    limit_pages: u32,
    cookies: Vec<CookieDescriptor>,
}

impl<S: Send + Sync> FromRequest<S> for ScrapeInput {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));
        if is_form {
            let form = Multipart::from_request(req, state)
                .await
                .map_err(|e| invalid(e.body_text()))?;
            return read_form(form).await;
        }

        let Json(body) = Json::<ScrapeRequest>::from_request(req, state)
            .await
            .map_err(|e| invalid(e.body_text()))?;
        let cookies = match &body.cookies {
            Some(value) => {
                cookies_from_value(value).map_err(|e| invalid(format!("cookies: {:#}", e)))?
            }
            None => Vec::new(),
        };
        Ok(Self {
            url: body.url,
            limit_pages: body.limit_pages,
            cookies,
        })
    }
}

async fn read_form(mut form: Multipart) -> Result<ScrapeInput, ApiError> {
    let mut url = None;
    let mut limit_pages = default_limit_pages();
    let mut cookies = Vec::new();

    while let Some(field) = form.next_field().await.map_err(|e| invalid(e.body_text()))? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("url") => {
                url = Some(field.text().await.map_err(|e| invalid(e.body_text()))?);
            }
            Some("limit_pages") => {
                let raw = field.text().await.map_err(|e| invalid(e.body_text()))?;
                limit_pages = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("limit_pages: {:?} is not a page count", raw)))?;
            }
            Some("cookie_file") => {
                let bytes = field.bytes().await.map_err(|e| invalid(e.body_text()))?;
                if !bytes.is_empty() {
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|_| invalid("cookie_file is not UTF-8 text"))?;
                    cookies = parse_cookie_jar(text)
                        .map_err(|e| invalid(format!("cookie_file: {:#}", e)))?;
                }
            }
            _ => {}
        }
    }

    Ok(ScrapeInput {
        url: url.ok_or_else(|| invalid("missing form field `url`"))?,
        limit_pages,
        cookies,
    })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!(
            "review-harvester {} is running. POST /scrape {{\"url\", \"limit_pages\"}}",
            env!("CARGO_PKG_VERSION")
        ),
    })
}

async fn scrape_handler<L: SessionLauncher + 'static>(
    State(state): State<AppState<L>>,
    input: ScrapeInput,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let harvest = HarvestRequest::new(input.url, input.limit_pages).with_cookies(input.cookies);
    // Reject bad input before queueing for a browser slot.
    harvest.validate().map_err(|e| api_error(&e))?;

    let _permit = state.session_limit.acquire().await.map_err(|_| {
        api_error(&HarvestError::Session("service is shutting down".to_string()))
    })?;
    info!("Processing scrape request: {} ({} page(s))", harvest.url, harvest.page_limit);

    match state.orchestrator.harvest(&harvest).await {
        Ok(report) => Ok(Json(ScrapeResponse {
            status: "success".to_string(),
            report,
        })),
        Err(e) => {
            error!("Harvest error: {}", e);
            Err(api_error(&e))
        }
    }
}
