use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token: login and every catalog read.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /login
        // Exchanges configured credentials for a one-hour bearer token.
        .route("/login", post(handlers::login))
        // GET /authors
        .route("/authors", get(handlers::get_authors))
        // GET /authors/city/{city}
        // Case-insensitive substring match on the author's city.
        .route("/authors/city/{city}", get(handlers::get_authors_by_city))
        // GET /authors/{id}
        .route("/authors/{id}", get(handlers::get_author))
        // GET /authors/{id}/books
        // 404 when the author itself is missing, an empty list when it has no books.
        .route("/authors/{id}/books", get(handlers::get_author_books))
        // GET /books
        .route("/books", get(handlers::get_books))
        // GET /books/city/{city}?startYear=...&endYear=...
        // Books by authors from a matching city, with the author embedded.
        .route("/books/city/{city}", get(handlers::get_books_by_city))
}
