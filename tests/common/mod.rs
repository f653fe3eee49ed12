#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use library_api::{
    AppConfig, AppState, InMemoryRepository, create_router,
    models::{Author, Book, CreateAuthorRequest, CreateBookRequest},
    repository::{Repository, RepositoryState},
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

/// Config with a known secret and the single `user1`/`pass1` login.
pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState::new(repo as RepositoryState, test_config())
}

pub fn test_router(repo: Arc<InMemoryRepository>) -> Router {
    create_router(test_state(repo))
}

pub fn valid_token() -> String {
    library_api::auth::issue_token(TEST_JWT_SECRET, "user1").unwrap()
}

/// The two demo authors and their books:
/// John Doe (New York) wrote "The Great Adventure" (2020) and "Old Streets" (1950);
/// Jane Doe (Toronto) wrote "Science 101" (2021).
pub struct Seeded {
    pub repo: Arc<InMemoryRepository>,
    pub john: Author,
    pub jane: Author,
    pub books: Vec<Book>,
}

pub async fn seeded() -> Seeded {
    let repo = Arc::new(InMemoryRepository::new());

    let john = repo
        .create_author(CreateAuthorRequest {
            name: "John Doe".to_string(),
            born: chrono::NaiveDate::from_ymd_opt(1990, 1, 1),
            city: "New York".to_string(),
        })
        .await
        .unwrap();
    let jane = repo
        .create_author(CreateAuthorRequest {
            name: "Jane Doe".to_string(),
            born: chrono::NaiveDate::from_ymd_opt(1992, 2, 1),
            city: "Toronto".to_string(),
        })
        .await
        .unwrap();

    let mut books = Vec::new();
    for (title, author_id, year, genre) in [
        ("The Great Adventure", john.id, 2020, "Adventure"),
        ("Old Streets", john.id, 1950, "History"),
        ("Science 101", jane.id, 2021, "Education"),
    ] {
        books.push(
            repo.create_book(CreateBookRequest {
                title: title.to_string(),
                author_id,
                year_published: year,
                genre: genre.to_string(),
            })
            .await
            .unwrap(),
        );
    }

    Seeded {
        repo,
        john,
        jane,
        books,
    }
}

/// Builds a request; `body` is sent as JSON when present.
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(router: &Router, req: Request<Body>) -> Response<Body> {
    router.clone().oneshot(req).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json_body(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn text_body(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
