//! crates/quote_feed_core/src/domain.rs
//!
//! Defines the pure, core data structures for the quote feed.
//! These types know nothing about HTTP, databases or the generation service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Quote
//=========================================================================================

/// A single quote: the original text, its author, a Chinese translation and,
/// when known, the work it comes from.
///
/// Quotes are immutable once built. The stored field name for the text is
/// `quote`; `text` is accepted on input as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "quote", alias = "text")]
    text: String,
    author: String,
    translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl Quote {
    pub fn new(
        text: impl Into<String>,
        author: impl Into<String>,
        translation: impl Into<String>,
        source: Option<String>,
    ) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            translation: translation.into(),
            source,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn translation(&self) -> &str {
        &self.translation
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The deduplication key of this quote. Depends on `(text, author)` only.
    pub fn id(&self) -> QuoteId {
        QuoteId::from_parts(&self.text, &self.author)
    }

    /// True when both quotes share the same `(text, author)` identity.
    pub fn same_as(&self, other: &Quote) -> bool {
        self.text == other.text && self.author == other.author
    }
}

//=========================================================================================
// QuoteId
//=========================================================================================

const ID_SEPARATOR: char = '|';

/// The derived string key used in the seen history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(String);

impl QuoteId {
    pub fn from_parts(text: &str, author: &str) -> Self {
        Self(format!("{text}{ID_SEPARATOR}{author}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for QuoteId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//=========================================================================================
// Category
//=========================================================================================

/// The fixed set of categories a user can browse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// No constraint on the topic.
    #[default]
    Any,
    Love,
    Courage,
    Wisdom,
    Success,
    Happiness,
    Life,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Any,
        Category::Love,
        Category::Courage,
        Category::Wisdom,
        Category::Success,
        Category::Happiness,
        Category::Life,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Category::Any => "any",
            Category::Love => "love",
            Category::Courage => "courage",
            Category::Wisdom => "wisdom",
            Category::Success => "success",
            Category::Happiness => "happiness",
            Category::Life => "life",
        }
    }

    /// The label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            Category::Any => "随机",
            Category::Love => "爱",
            Category::Courage => "勇气",
            Category::Wisdom => "智慧",
            Category::Success => "成功",
            Category::Happiness => "幸福",
            Category::Life => "人生",
        }
    }

    pub fn is_any(self) -> bool {
        self == Category::Any
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Accepts either the slug (case-insensitive) or the user-facing label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.slug().eq_ignore_ascii_case(trimmed) || c.label() == trimmed)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_ignores_translation_and_source() {
        let a = Quote::new("Veni, vidi, vici.", "Caesar", "我来，我见，我征服。", None);
        let b = Quote::new(
            "Veni, vidi, vici.",
            "Caesar",
            "I came, I saw, I conquered.",
            Some("Plutarch".to_string()),
        );
        assert_eq!(a.id(), b.id());
        assert!(a.same_as(&b));
    }

    #[test]
    fn id_changes_with_author() {
        let a = Quote::new("Know thyself.", "Socrates", "认识你自己。", None);
        let b = Quote::new("Know thyself.", "Thales", "认识你自己。", None);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().as_str(), "Know thyself.|Socrates");
    }

    #[test]
    fn quote_reads_either_text_field_name() {
        let from_quote: Quote =
            serde_json::from_str(r#"{"quote":"a","author":"b","translation":"c"}"#).unwrap();
        let from_text: Quote =
            serde_json::from_str(r#"{"text":"a","author":"b","translation":"c"}"#).unwrap();
        assert_eq!(from_quote, from_text);

        let written = serde_json::to_value(&from_quote).unwrap();
        assert_eq!(written["quote"], "a");
        assert!(written.get("source").is_none());
    }

    #[test]
    fn category_parses_slug_and_label() {
        assert_eq!("courage".parse::<Category>().unwrap(), Category::Courage);
        assert_eq!("LOVE".parse::<Category>().unwrap(), Category::Love);
        assert_eq!("随机".parse::<Category>().unwrap(), Category::Any);
        assert!("weather".parse::<Category>().is_err());
    }
}
