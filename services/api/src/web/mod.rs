pub mod protocol;
pub mod rest;
pub mod state;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use rest::{
    change_category_handler, clear_favorites_handler, get_feed_handler, list_categories_handler,
    list_favorites_handler, next_quote_handler, remove_favorite_handler, retry_handler,
    router, toggle_favorite_handler,
};
