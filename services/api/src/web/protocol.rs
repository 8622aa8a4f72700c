//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API.
//! Core types stay free of HTTP concerns; these views are built from them.

use quote_feed_core::{Category, FeedSnapshot, FeedStatus, Quote};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Payloads Sent FROM the Server TO the Client
//=========================================================================================

/// A quote as shown to the user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct QuoteView {
    /// The identifier used by `DELETE /favorites/{id}`.
    pub id: String,
    pub quote: String,
    pub author: String,
    pub translation: String,
    pub source: Option<String>,
}

impl From<&Quote> for QuoteView {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id().to_string(),
            quote: quote.text().to_string(),
            author: quote.author().to_string(),
            translation: quote.translation().to_string(),
            source: quote.source().map(str::to_string),
        }
    }
}

/// The state of the feed.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct FeedView {
    pub category: CategoryView,
    /// One of `idle`, `loading`, `ready`, `error`.
    pub status: String,
    pub quote: Option<QuoteView>,
    /// Quotes waiting to be shown without a new fetch.
    pub pending: usize,
    pub is_favorite: bool,
    /// Message of the last failed fetch, shown with a retry control.
    pub error: Option<String>,
}

impl FeedView {
    pub fn new(snapshot: &FeedSnapshot, is_favorite: bool) -> Self {
        let status = match snapshot.status {
            FeedStatus::Idle => "idle",
            FeedStatus::Loading => "loading",
            FeedStatus::Ready => "ready",
            FeedStatus::Error => "error",
        };
        Self {
            category: snapshot.category.into(),
            status: status.to_string(),
            quote: snapshot.current.as_ref().map(QuoteView::from),
            pending: snapshot.pending,
            is_favorite,
            error: snapshot.error.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct CategoryView {
    pub slug: String,
    pub label: String,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        Self {
            slug: category.slug().to_string(),
            label: category.label().to_string(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ToggleFavoriteResponse {
    /// Whether the quote is a favorite after the toggle.
    pub favorite: bool,
    pub quote: QuoteView,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ClearFavoritesResponse {
    pub removed: usize,
}

//=========================================================================================
// Payloads Sent FROM the Client TO the Server
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
pub struct ChangeCategoryRequest {
    /// A category slug (`love`) or label (`爱`).
    pub category: String,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClearFavoritesQuery {
    /// Must be `true`; clearing every favorite cannot be undone.
    #[serde(default)]
    pub confirm: bool,
}
