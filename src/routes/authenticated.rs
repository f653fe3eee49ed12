use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post, put},
};

/// Authenticated Router Module
///
/// Every state-changing catalog operation. `create_router` wraps this router in
/// the `require_auth` layer, so each handler here receives a verified
/// `AuthUser`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /authors
        .route("/authors", post(handlers::create_author))
        // PUT /authors/{id}
        // Partial update; absent fields keep their stored value.
        .route("/authors/{id}", put(handlers::update_author))
        // POST /authors/{id}/books
        // Validated with the book rules, then 404 if the author is missing.
        .route("/authors/{id}/books", post(handlers::create_author_book))
        // POST /books
        // Validated with the book rules before anything touches the store.
        .route("/books", post(handlers::create_book))
        // DELETE /books/{id}
        // 204 on the first call, 404 once the book is gone.
        .route("/books/{id}", delete(handlers::delete_book))
}
