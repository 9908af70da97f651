use super::error::{ErrorKind, HarvestError};
use serde::{Deserialize, Serialize};

/// Raw badge text or a coerced score, depending on [`RatingPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rating {
    Score(u8),
    Text(String),
}

impl Default for Rating {
    fn default() -> Self {
        Rating::Text(String::new())
    }
}

/// How the rating badge text is stored on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RatingPolicy {
    /// Keep the badge text exactly as rendered (empty when absent).
    Raw,
    /// Parse the badge as an integer; anything unparsable becomes `fallback`.
    Coerce { fallback: u8 },
}

impl Default for RatingPolicy {
    fn default() -> Self {
        RatingPolicy::Raw
    }
}

impl RatingPolicy {
    pub fn apply(&self, raw: &str) -> Rating {
        match self {
            RatingPolicy::Raw => Rating::Text(raw.to_string()),
            RatingPolicy::Coerce { fallback } => {
                Rating::Score(raw.trim().parse::<u8>().unwrap_or(*fallback))
            }
        }
    }
}

/// One harvested review. Every field is always present; selector misses
/// degrade to the empty/zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub nickname: String,
    pub date: String,
    pub rating: Rating,
    pub option: String,
    pub auto_label: String,
    pub content: String,
    pub image_count: u32,
}

/// 1-based location of a card within a harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardPosition {
    pub page: u32,
    pub index: usize,
}

impl std::fmt::Display for CardPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page {}, #{}", self.page, self.index)
    }
}

/// A card rejected by the dedup tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateHit {
    pub key: String,
    pub first_seen: CardPosition,
    pub repeated_at: CardPosition,
}

/// Why the page loop stopped on a successful harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No next-page control matched the following ordinal.
    Exhausted,
    /// The caller's page limit was reached.
    LimitReached,
    /// The current page rendered zero cards.
    NoCards,
    /// The surface could not be read any more.
    SurfaceLost,
}

/// Why the harvest fell back to the top-level document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    ReviewTabNotFound,
    FrameNotFound,
}

/// Where the review cards were read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceOrigin {
    EmbeddedFrame { url: String },
    TopLevel { reason: FallbackReason },
}

/// A non-fatal degradation collected during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestWarning {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<&HarvestError> for HarvestWarning {
    fn from(err: &HarvestError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Result of one successful (possibly degraded) harvest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestReport {
    pub url: String,
    pub count: usize,
    pub reviews: Vec<ReviewRecord>,
    pub pages_visited: u32,
    pub termination: Termination,
    pub surface: SurfaceOrigin,
    #[serde(default)]
    pub warnings: Vec<HarvestWarning>,
    #[serde(default)]
    pub duplicates: Vec<DuplicateHit>,
    pub harvested_at: String,
}

// ── HTTP shapes ──────────────────────────────────────────────────────────────

pub(crate) fn default_limit_pages() -> u32 {
    3
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default = "default_limit_pages")]
    pub limit_pages: u32,
    /// Cookie export: bare array or `{"cookies": [...]}`.
    #[serde(default)]
    pub cookies: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub status: String,
    #[serde(flatten)]
    pub report: HarvestReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub kind: Option<ErrorKind>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn rating_policy_raw_keeps_text() {
        assert_eq!(RatingPolicy::Raw.apply("5"), Rating::Text("5".into()));
        assert_eq!(RatingPolicy::Raw.apply(""), Rating::Text(String::new()));
    }

    #[test]
    fn rating_policy_coerce_falls_back() {
        let policy = RatingPolicy::Coerce { fallback: 5 };
        assert_eq!(policy.apply(" 4 "), Rating::Score(4));
        assert_eq!(policy.apply(""), Rating::Score(5));
        assert_eq!(policy.apply("별점"), Rating::Score(5));
    }

    #[test]
    fn record_serializes_with_snake_case_columns() {
        let record = ReviewRecord {
            nickname: "abc***".into(),
            rating: Rating::Score(5),
            image_count: 2,
            ..Default::default()
        };
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["auto_label"], json!(""));
        assert_eq!(v["image_count"], json!(2));
        assert_eq!(v["rating"], json!(5));
    }

    #[test]
    fn scrape_request_defaults_limit() {
        let req: ScrapeRequest =
            serde_json::from_value(json!({"url": "https://example.com/p/1"})).unwrap();
        assert_eq!(req.limit_pages, 3);
        assert!(req.cookies.is_none());
    }

    #[test]
    fn termination_covers_only_successful_stops() {
        let names: Vec<Value> = [
            Termination::Exhausted,
            Termination::LimitReached,
            Termination::NoCards,
            Termination::SurfaceLost,
        ]
        .iter()
        .map(|t| serde_json::to_value(t).unwrap())
        .collect();
        assert_eq!(
            names,
            [json!("exhausted"), json!("limit_reached"), json!("no_cards"), json!("surface_lost")]
        );
        // a persistent block is a fatal error, never a report outcome
        assert!(serde_json::from_value::<Termination>(json!("blocked")).is_err());
    }

    #[test]
    fn rating_policy_deserializes_tagged() {
        let p: RatingPolicy = serde_json::from_value(json!({"mode": "coerce", "fallback": 5})).unwrap();
        assert_eq!(p, RatingPolicy::Coerce { fallback: 5 });
        let p: RatingPolicy = serde_json::from_value(json!({"mode": "raw"})).unwrap();
        assert_eq!(p, RatingPolicy::Raw);
    }
}
