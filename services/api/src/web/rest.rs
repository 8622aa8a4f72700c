//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    protocol::{
        CategoryView, ChangeCategoryRequest, ClearFavoritesQuery, ClearFavoritesResponse,
        FeedView, QuoteView, ToggleFavoriteResponse,
    },
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use quote_feed_core::{Category, FeedError, PortError, QuoteId};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::OpenApi;

/// What every handler returns on failure: a status and a message for the user.
type HandlerError = (StatusCode, String);

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_feed_handler,
        next_quote_handler,
        retry_handler,
        change_category_handler,
        list_categories_handler,
        list_favorites_handler,
        toggle_favorite_handler,
        remove_favorite_handler,
        clear_favorites_handler,
    ),
    components(
        schemas(
            FeedView,
            QuoteView,
            CategoryView,
            ChangeCategoryRequest,
            ToggleFavoriteResponse,
            ClearFavoritesResponse
        )
    ),
    tags(
        (name = "Quote Feed API", description = "Endpoints for browsing quotes and managing favorites.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds the API router over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/quote", get(get_feed_handler))
        .route("/quote/next", post(next_quote_handler))
        .route("/quote/retry", post(retry_handler))
        .route("/category", put(change_category_handler))
        .route("/categories", get(list_categories_handler))
        .route(
            "/favorites",
            get(list_favorites_handler).delete(clear_favorites_handler),
        )
        .route("/favorites/toggle", post(toggle_favorite_handler))
        .route("/favorites/{id}", delete(remove_favorite_handler))
        .with_state(app_state)
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn feed_error(e: FeedError) -> HandlerError {
    let status = match &e {
        FeedError::Busy => StatusCode::CONFLICT,
        FeedError::NoFreshQuotes { .. } => StatusCode::NOT_FOUND,
        FeedError::Fetch(_) => StatusCode::BAD_GATEWAY,
        FeedError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn port_error(e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        other => {
            error!("Storage operation failed: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update favorites".to_string(),
            )
        }
    }
}

async fn current_view(app_state: &AppState) -> FeedView {
    let snapshot = app_state.feed.snapshot();
    let is_favorite = match &snapshot.current {
        Some(quote) => app_state.favorites.is_favorite(quote).await,
        None => false,
    };
    FeedView::new(&snapshot, is_favorite)
}

//=========================================================================================
// Feed Handlers
//=========================================================================================

/// Get the current state of the feed.
#[utoipa::path(
    get,
    path = "/quote",
    responses(
        (status = 200, description = "The current feed state", body = FeedView)
    )
)]
pub async fn get_feed_handler(State(app_state): State<Arc<AppState>>) -> Json<FeedView> {
    Json(current_view(&app_state).await)
}

/// Show the next quote.
///
/// Served from the pending queue when possible; otherwise a new batch is fetched.
#[utoipa::path(
    post,
    path = "/quote/next",
    responses(
        (status = 200, description = "The next quote is displayed", body = FeedView),
        (status = 404, description = "No unseen quotes are left in this category"),
        (status = 409, description = "Another request is already loading"),
        (status = 502, description = "The quote service failed")
    )
)]
pub async fn next_quote_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<FeedView>, HandlerError> {
    app_state.feed.next().await.map_err(feed_error)?;
    Ok(Json(current_view(&app_state).await))
}

/// Try again after an error. Quotes still queued are served before any fetch.
#[utoipa::path(
    post,
    path = "/quote/retry",
    responses(
        (status = 200, description = "A fresh quote is displayed", body = FeedView),
        (status = 404, description = "No unseen quotes are left in this category"),
        (status = 409, description = "Another request is already loading"),
        (status = 500, description = "The fetch task was interrupted"),
        (status = 502, description = "The quote service failed")
    )
)]
pub async fn retry_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<FeedView>, HandlerError> {
    app_state.feed.retry().await.map_err(feed_error)?;
    Ok(Json(current_view(&app_state).await))
}

/// Switch the category and load its first quote.
#[utoipa::path(
    put,
    path = "/category",
    request_body = ChangeCategoryRequest,
    responses(
        (status = 200, description = "Category switched", body = FeedView),
        (status = 400, description = "Unknown category"),
        (status = 404, description = "No unseen quotes are left in this category"),
        (status = 409, description = "Another request is already loading"),
        (status = 502, description = "The quote service failed")
    )
)]
pub async fn change_category_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<ChangeCategoryRequest>,
) -> Result<Json<FeedView>, HandlerError> {
    let category = body
        .category
        .parse::<Category>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    app_state
        .feed
        .change_category(category)
        .await
        .map_err(feed_error)?;
    Ok(Json(current_view(&app_state).await))
}

/// List the available categories.
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "All categories", body = [CategoryView])
    )
)]
pub async fn list_categories_handler() -> Json<Vec<CategoryView>> {
    Json(Category::ALL.into_iter().map(CategoryView::from).collect())
}

//=========================================================================================
// Favorites Handlers
//=========================================================================================

/// List favorite quotes in the order they were added.
#[utoipa::path(
    get,
    path = "/favorites",
    responses(
        (status = 200, description = "All favorites", body = [QuoteView])
    )
)]
pub async fn list_favorites_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Vec<QuoteView>> {
    let favorites = app_state.favorites.list().await;
    Json(favorites.iter().map(QuoteView::from).collect())
}

/// Add the displayed quote to the favorites, or remove it if already there.
#[utoipa::path(
    post,
    path = "/favorites/toggle",
    responses(
        (status = 200, description = "Favorite toggled", body = ToggleFavoriteResponse),
        (status = 409, description = "No quote is displayed")
    )
)]
pub async fn toggle_favorite_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ToggleFavoriteResponse>, HandlerError> {
    let quote = app_state.feed.snapshot().current.ok_or_else(|| {
        (
            StatusCode::CONFLICT,
            "No quote is displayed".to_string(),
        )
    })?;

    let favorite = app_state
        .favorites
        .toggle(&quote)
        .await
        .map_err(port_error)?;
    info!("Quote {} favorite: {}", quote.id(), favorite);

    Ok(Json(ToggleFavoriteResponse {
        favorite,
        quote: QuoteView::from(&quote),
    }))
}

/// Remove one favorite by its identifier.
#[utoipa::path(
    delete,
    path = "/favorites/{id}",
    params(
        ("id" = String, Path, description = "The quote identifier, as returned in `QuoteView.id`.")
    ),
    responses(
        (status = 200, description = "The removed favorite", body = QuoteView),
        (status = 404, description = "Not a favorite")
    )
)]
pub async fn remove_favorite_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QuoteView>, HandlerError> {
    let removed = app_state
        .favorites
        .remove(&QuoteId::from(id))
        .await
        .map_err(port_error)?;
    Ok(Json(QuoteView::from(&removed)))
}

/// Remove every favorite. Requires `confirm=true`.
#[utoipa::path(
    delete,
    path = "/favorites",
    params(ClearFavoritesQuery),
    responses(
        (status = 200, description = "Favorites cleared", body = ClearFavoritesResponse),
        (status = 400, description = "The request was not confirmed")
    )
)]
pub async fn clear_favorites_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ClearFavoritesQuery>,
) -> Result<Json<ClearFavoritesResponse>, HandlerError> {
    if !query.confirm {
        warn!("Refused to clear favorites without confirmation.");
        return Err((
            StatusCode::BAD_REQUEST,
            "Clearing all favorites requires confirm=true".to_string(),
        ));
    }

    let removed = app_state.favorites.clear().await.map_err(port_error)?;
    info!("Cleared {} favorites.", removed);
    Ok(Json(ClearFavoritesResponse { removed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use quote_feed_core::{
        GenerationRequest, InMemoryStore, KeyValueStore, PortResult, QuoteGenerationService,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every request with a new batch of three numbered quotes.
    #[derive(Default)]
    struct CountingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteGenerationService for CountingGenerator {
        async fn generate_quotes(&self, _request: &GenerationRequest) -> PortResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let quotes: Vec<serde_json::Value> = (0..3)
                .map(|i| {
                    serde_json::json!({
                        "quote": format!("Quote {n}-{i}"),
                        "author": "Anonymous",
                        "translation": format!("名言 {n}-{i}"),
                    })
                })
                .collect();
            Ok(serde_json::json!({ "quotes": quotes }).to_string())
        }
    }

    struct DownGenerator;

    #[async_trait]
    impl QuoteGenerationService for DownGenerator {
        async fn generate_quotes(&self, _request: &GenerationRequest) -> PortResult<String> {
            Err(quote_feed_core::PortError::Unavailable("503".to_string()))
        }
    }

    async fn state_with(
        generator: Arc<dyn QuoteGenerationService>,
        vars: &[(&str, &str)],
    ) -> Arc<AppState> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        })
        .unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        Arc::new(AppState::build(Arc::new(config), generator, store).await)
    }

    #[tokio::test]
    async fn next_then_favorite_the_displayed_quote() {
        let state = state_with(Arc::new(CountingGenerator::default()), &[]).await;

        let Json(view) = next_quote_handler(State(state.clone())).await.unwrap();
        assert_eq!(view.status, "ready");
        assert_eq!(view.pending, 2);
        let shown = view.quote.unwrap();
        assert_eq!(shown.quote, "Quote 0-0");
        assert!(!view.is_favorite);

        let Json(toggled) = toggle_favorite_handler(State(state.clone())).await.unwrap();
        assert!(toggled.favorite);
        assert_eq!(toggled.quote, shown);

        let Json(view) = get_feed_handler(State(state.clone())).await;
        assert!(view.is_favorite);

        let Json(favorites) = list_favorites_handler(State(state)).await;
        assert_eq!(favorites, vec![shown]);
    }

    #[tokio::test]
    async fn category_change_rejects_unknown_names() {
        let state = state_with(Arc::new(CountingGenerator::default()), &[]).await;

        let err = change_category_handler(
            State(state.clone()),
            Json(ChangeCategoryRequest {
                category: "weather".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let Json(view) = change_category_handler(
            State(state),
            Json(ChangeCategoryRequest {
                category: "爱".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(view.category.slug, "love");
        assert_eq!(view.status, "ready");
    }

    #[tokio::test]
    async fn surfaced_outage_maps_to_bad_gateway() {
        let state = state_with(Arc::new(DownGenerator), &[("QUOTE_FALLBACK", "surface")]).await;

        let err = next_quote_handler(State(state.clone())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_GATEWAY);

        let Json(view) = get_feed_handler(State(state)).await;
        assert_eq!(view.status, "error");
        assert!(view.quote.is_none());
        assert!(view.error.is_some());
    }

    #[tokio::test]
    async fn served_outage_shows_fallback_then_runs_dry() {
        let state = state_with(Arc::new(DownGenerator), &[]).await;

        let Json(view) = next_quote_handler(State(state.clone())).await.unwrap();
        assert_eq!(view.quote.unwrap().author, "孔子");
        next_quote_handler(State(state.clone())).await.unwrap();

        // Both fallback quotes are now in the seen history.
        let err = next_quote_handler(State(state)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn clearing_favorites_needs_confirmation() {
        let state = state_with(Arc::new(CountingGenerator::default()), &[]).await;
        next_quote_handler(State(state.clone())).await.unwrap();
        toggle_favorite_handler(State(state.clone())).await.unwrap();

        let err = clear_favorites_handler(State(state.clone()), Query(ClearFavoritesQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let Json(cleared) =
            clear_favorites_handler(State(state), Query(ClearFavoritesQuery { confirm: true }))
                .await
                .unwrap();
        assert_eq!(cleared.removed, 1);
    }

    #[tokio::test]
    async fn removing_an_unknown_favorite_is_not_found() {
        let state = state_with(Arc::new(CountingGenerator::default()), &[]).await;
        let err = remove_favorite_handler(State(state), Path("nope|nobody".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn toggling_without_a_quote_conflicts() {
        let state = state_with(Arc::new(CountingGenerator::default()), &[]).await;
        let err = toggle_favorite_handler(State(state)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[test]
    fn openapi_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/quote", "/quote/next", "/category", "/favorites", "/favorites/{id}"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
