//! Review card → [`ReviewRecord`] mapping.
//!
//! Parsing is a pure function over a `scraper` element. Every lookup that
//! misses degrades exactly one field to its default and is reported in
//! [`ParsedCard::missing`]; nothing here can fail the batch.

use super::markup::{CardSelectors, MarkupContract};
use crate::core::error::ConfigError;
use crate::types::{RatingPolicy, ReviewRecord};
use scraper::{ElementRef, Html};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardField {
    Nickname,
    Date,
    Rating,
    Option,
    Buyer,
    Label,
    Content,
    Images,
}

impl CardField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardField::Nickname => "nickname",
            CardField::Date => "date",
            CardField::Rating => "rating",
            CardField::Option => "option",
            CardField::Buyer => "buyer",
            CardField::Label => "label",
            CardField::Content => "content",
            CardField::Images => "images",
        }
    }

    /// Fields every rendered review carries. Option, buyer, label and images
    /// are legitimately absent on many cards.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            CardField::Nickname | CardField::Date | CardField::Rating | CardField::Content
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCard {
    pub record: ReviewRecord,
    /// Sub-elements whose selector matched nothing.
    pub missing: Vec<CardField>,
}

/// Stripped text nodes of `el`, joined with `sep`. Empty nodes are dropped.
fn joined_text(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

pub struct CardParser {
    selectors: CardSelectors,
    rating_policy: RatingPolicy,
}

impl CardParser {
    pub fn new(contract: &MarkupContract, rating_policy: RatingPolicy) -> Result<Self, ConfigError> {
        Ok(Self {
            selectors: contract.compile()?,
            rating_policy,
        })
    }

    /// Parse a standalone fragment. Returns `None` when the fragment holds no
    /// element matching the card selector.
    pub fn parse_fragment(&self, fragment: &str) -> Option<ParsedCard> {
        let doc = Html::parse_fragment(fragment);
        let card = doc.select(&self.selectors.card).next()?;
        Some(self.parse_card(card))
    }

    /// Every card of a surface snapshot, in document order.
    pub fn extract_cards(&self, html: &str) -> Vec<ParsedCard> {
        let doc = Html::parse_document(html);
        doc.select(&self.selectors.card)
            .map(|card| self.parse_card(card))
            .collect()
    }

    pub fn parse_card(&self, card: ElementRef<'_>) -> ParsedCard {
        let s = &self.selectors;
        let mut missing = Vec::new();
        let mut first = |field: CardField, sel: &scraper::Selector| {
            let found = card.select(sel).next();
            if found.is_none() {
                missing.push(field);
            }
            found
        };

        let nickname = first(CardField::Nickname, &s.nickname)
            .map(|el| joined_text(el, ""))
            .unwrap_or_default();
        let date = first(CardField::Date, &s.date)
            .map(|el| joined_text(el, ""))
            .unwrap_or_default();
        let rating_raw = first(CardField::Rating, &s.rating)
            .map(|el| joined_text(el, ""))
            .unwrap_or_default();

        // Only the first line of the option box; later lines are size/colour noise.
        let option = first(CardField::Option, &s.option)
            .and_then(|el| {
                el.text()
                    .map(str::trim)
                    .find(|t| !t.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        let buyer = first(CardField::Buyer, &s.buyer)
            .map(|el| joined_text(el, " "))
            .unwrap_or_default();
        let label = first(CardField::Label, &s.label)
            .map(|el| joined_text(el, " "))
            .unwrap_or_default();
        let auto_label = [buyer.trim(), label.trim()]
            .into_iter()
            .filter(|x| !x.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");

        let content = first(CardField::Content, &s.content)
            .map(|el| self.fold_content(el))
            .unwrap_or_default();

        let image_count = first(CardField::Images, &s.image_box)
            .map(|el| self.count_images(el))
            .unwrap_or(0);

        ParsedCard {
            record: ReviewRecord {
                nickname,
                date,
                rating: self.rating_policy.apply(&rating_raw),
                option,
                auto_label,
                content,
                image_count,
            },
            missing,
        }
    }

    /// Leading spans are tags ("한달사용", "재구매"), the last span is the body.
    fn fold_content(&self, content_box: ElementRef<'_>) -> String {
        let spans: Vec<ElementRef<'_>> = content_box.select(&self.selectors.content_span).collect();
        match spans.split_last() {
            None => String::new(),
            Some((body, [])) => joined_text(*body, " "),
            Some((body, tags)) => tags
                .iter()
                .map(|t| joined_text(*t, ""))
                .filter(|t| !t.is_empty())
                .chain(std::iter::once(joined_text(*body, " ")))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// The counter badge is only rendered for two or more images, so a bare
    /// thumbnail counts as one.
    fn count_images(&self, image_box: ElementRef<'_>) -> u32 {
        if let Some(counter) = image_box.select(&self.selectors.image_counter).next() {
            let digits: String = joined_text(counter, "")
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            return digits.parse().unwrap_or(0);
        }
        if image_box.select(&self.selectors.image).next().is_some() {
            1
        } else {
            0
        }
    }
}
