//! The storefront markup contract.
//!
//! Every structural selector the engine depends on lives here, in one
//! versioned mapping that can be replaced from the config file when the
//! storefront ships new class names. Nothing else in the crate hard-codes a
//! selector.

use crate::core::error::ConfigError;
use scraper::Selector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupContract {
    /// Free-form label, logged at harvest start.
    pub version: String,
    /// Clickable "reviews" tab on the product page.
    pub review_tab: String,
    /// One review card.
    pub card: String,
    pub nickname: String,
    pub date: String,
    pub rating: String,
    pub option: String,
    pub buyer: String,
    pub label: String,
    pub content: String,
    /// Span elements inside `content`; all but the last are tags.
    pub content_span: String,
    pub image_box: String,
    pub image_counter: String,
    pub image: String,
    /// Region that holds the numbered page links.
    pub pagination: String,
    /// Candidate next-page controls inside `pagination`.
    pub page_link: String,
    /// Lower-case substrings that identify the review frame URL.
    pub frame_url_markers: Vec<String>,
    /// Denial text substituted by the anti-automation layer.
    pub block_signatures: Vec<String>,
}

impl Default for MarkupContract {
    fn default() -> Self {
        Self {
            version: "smartstore-2025.11".to_string(),
            review_tab: r#"[data-name="REVIEW"]"#.to_string(),
            card: ".IwcuBUIAKf".to_string(),
            nickname: ".Db9Dtnf7gY strong".to_string(),
            date: ".Db9Dtnf7gY span:nth-of-type(1)".to_string(),
            rating: "em.n6zq2yy0KA".to_string(),
            option: ".b_caIle8kC".to_string(),
            buyer: ".eWRrdDdSzW".to_string(),
            label: ".h8uqAeqIe7".to_string(),
            content: ".KqJ8Qqw082".to_string(),
            content_span: "span".to_string(),
            image_box: ".s30AvhHfb0".to_string(),
            image_counter: ".lOzR1kO8jf".to_string(),
            image: "img".to_string(),
            pagination: ".LiT9lKOVbw".to_string(),
            page_link: "a".to_string(),
            frame_url_markers: vec!["review".to_string(), "pstatic".to_string()],
            block_signatures: vec![
                "서비스 접속이 불가합니다".to_string(),
                "Access Denied".to_string(),
            ],
        }
    }
}

/// Card-level selectors, parsed once per harvest.
#[derive(Debug, Clone)]
pub struct CardSelectors {
    pub card: Selector,
    pub nickname: Selector,
    pub date: Selector,
    pub rating: Selector,
    pub option: Selector,
    pub buyer: Selector,
    pub label: Selector,
    pub content: Selector,
    pub content_span: Selector,
    pub image_box: Selector,
    pub image_counter: Selector,
    pub image: Selector,
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}

impl MarkupContract {
    pub fn compile(&self) -> Result<CardSelectors, ConfigError> {
        Ok(CardSelectors {
            card: compile("card", &self.card)?,
            nickname: compile("nickname", &self.nickname)?,
            date: compile("date", &self.date)?,
            rating: compile("rating", &self.rating)?,
            option: compile("option", &self.option)?,
            buyer: compile("buyer", &self.buyer)?,
            label: compile("label", &self.label)?,
            content: compile("content", &self.content)?,
            content_span: compile("content_span", &self.content_span)?,
            image_box: compile("image_box", &self.image_box)?,
            image_counter: compile("image_counter", &self.image_counter)?,
            image: compile("image", &self.image)?,
        })
    }

    /// Validates the selectors that only run inside the browser too, so a bad
    /// override fails at load time rather than mid-harvest.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile()?;
        compile("review_tab", &self.review_tab)?;
        compile("pagination", &self.pagination)?;
        compile("page_link", &self.page_link)?;
        Ok(())
    }

    pub fn matches_review_frame(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.frame_url_markers
            .iter()
            .any(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
    }
}
