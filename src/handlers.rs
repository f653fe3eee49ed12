use crate::{
    AppState,
    auth::{self, AuthUser},
    config::AppConfig,
    error::ApiError,
    models::{
        Author, Book, BookWithAuthor, CreateAuthorBookRequest, CreateAuthorRequest,
        CreateBookRequest, LoginRequest, LoginResponse, UpdateAuthorRequest, YearRange,
    },
    validators::{self, BOOK_RULES},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

const AUTHOR_NOT_FOUND: &str = "Author not found";
const BOOK_NOT_FOUND: &str = "Book not found";

/// Path ids arrive as raw text. Anything that is not an `i32` cannot name a
/// stored row, so it is reported as that row being missing.
fn parse_id(raw: &str, not_found: &'static str) -> Result<i32, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound(not_found))
}

// --- Filter Structs ---

/// BookCityQuery
///
/// Optional year bounds for `GET /books/city/{city}`. Kept as raw strings: the
/// range only applies when both parse as integers, anything else is ignored.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct BookCityQuery {
    /// Lower bound on `yearPublished`, inclusive.
    pub start_year: Option<String>,
    /// Upper bound on `yearPublished`, inclusive.
    pub end_year: Option<String>,
}

impl BookCityQuery {
    pub fn year_range(&self) -> Option<YearRange> {
        YearRange::parse(self.start_year.as_deref(), self.end_year.as_deref())
    }
}

// --- Login ---

/// login
///
/// [Public Route] Exchanges a configured username/password pair for a signed
/// bearer token valid for one hour.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(config): State<AppConfig>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Ok(Json(payload)) = payload else {
        tracing::warn!("login rejected: unreadable credentials body");
        return Err(ApiError::InvalidCredentials);
    };

    let Some(user) = config.find_user(&payload.username, &payload.password) else {
        tracing::warn!(username = %payload.username, "login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let token = auth::issue_token(&config.jwt_secret, &user.username)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(username = %user.username, "login succeeded");
    Ok(Json(LoginResponse { token }))
}

// --- Authors ---

/// get_authors
///
/// [Public Route] Lists every author.
#[utoipa::path(
    get,
    path = "/api/authors",
    responses((status = 200, description = "All authors", body = [Author]))
)]
pub async fn get_authors(State(state): State<AppState>) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.repo.list_authors().await?))
}

/// get_authors_by_city
///
/// [Public Route] Lists authors whose city contains `city`, ignoring case.
#[utoipa::path(
    get,
    path = "/api/authors/city/{city}",
    params(("city" = String, Path, description = "Substring of the author's city")),
    responses((status = 200, description = "Matching authors", body = [Author]))
)]
pub async fn get_authors_by_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.repo.find_authors_by_city(&city).await?))
}

/// get_author
///
/// [Public Route] Retrieves a single author by id.
#[utoipa::path(
    get,
    path = "/api/authors/{id}",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Found", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Author>, ApiError> {
    let id = parse_id(&id, AUTHOR_NOT_FOUND)?;
    match state.repo.get_author(id).await? {
        Some(author) => Ok(Json(author)),
        None => Err(ApiError::NotFound(AUTHOR_NOT_FOUND)),
    }
}

/// get_author_books
///
/// [Public Route] Lists the books of one author. The author and its books come
/// back from a single joined query; only the books are returned.
#[utoipa::path(
    get,
    path = "/api/authors/{id}/books",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "The author's books", body = [Book]),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author_books(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let id = parse_id(&id, AUTHOR_NOT_FOUND)?;
    match state.repo.get_author_with_books(id).await? {
        Some(view) => Ok(Json(view.books)),
        None => Err(ApiError::NotFound(AUTHOR_NOT_FOUND)),
    }
}

/// create_author
///
/// [Authenticated Route] Adds a new author.
#[utoipa::path(
    post,
    path = "/api/authors",
    request_body = CreateAuthorRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Created", body = Author),
        (status = 401, description = "Missing token"),
        (status = 403, description = "Invalid or expired token")
    )
)]
pub async fn create_author(
    AuthUser { username }: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateAuthorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Author>), ApiError> {
    let Json(payload) = payload?;
    let author = state.repo.create_author(payload).await?;
    tracing::info!(%username, author_id = author.id, "author created");
    Ok((StatusCode::CREATED, Json(author)))
}

/// update_author
///
/// [Authenticated Route] Merges the fields present in the body into an existing
/// author. The id itself can never change.
#[utoipa::path(
    put,
    path = "/api/authors/{id}",
    params(("id" = i32, Path, description = "Author ID")),
    request_body = UpdateAuthorRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    AuthUser { username }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAuthorRequest>, JsonRejection>,
) -> Result<Json<Author>, ApiError> {
    let id = parse_id(&id, AUTHOR_NOT_FOUND)?;
    let Json(payload) = payload?;
    match state.repo.update_author(id, payload).await? {
        Some(author) => {
            tracing::info!(%username, author_id = id, "author updated");
            Ok(Json(author))
        }
        None => Err(ApiError::NotFound(AUTHOR_NOT_FOUND)),
    }
}

/// create_author_book
///
/// [Authenticated Route] Adds a book to an existing author. The body goes
/// through the book validator before the author is looked up.
#[utoipa::path(
    post,
    path = "/api/authors/{id}/books",
    params(("id" = i32, Path, description = "Author ID")),
    request_body = CreateAuthorBookRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Created", body = Book),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn create_author_book(
    AuthUser { username }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let Json(body) = body?;
    let payload: CreateAuthorBookRequest = validators::validated(body, BOOK_RULES)?;

    let id = parse_id(&id, AUTHOR_NOT_FOUND)?;
    let Some(author) = state.repo.get_author(id).await? else {
        return Err(ApiError::NotFound(AUTHOR_NOT_FOUND));
    };

    let book = state.repo.create_book(payload.for_author(author.id)).await?;
    tracing::info!(%username, author_id = id, book_id = book.id, "book created for author");
    Ok((StatusCode::CREATED, Json(book)))
}

// --- Books ---

/// get_books
///
/// [Public Route] Lists every book.
#[utoipa::path(
    get,
    path = "/api/books",
    responses((status = 200, description = "All books", body = [Book]))
)]
pub async fn get_books(State(state): State<AppState>) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.repo.list_books().await?))
}

/// get_books_by_city
///
/// [Public Route] Lists books whose author's city contains `city`, each with
/// its author embedded. `startYear` and `endYear` narrow the result to an
/// inclusive publication range when both are integers.
#[utoipa::path(
    get,
    path = "/api/books/city/{city}",
    params(
        ("city" = String, Path, description = "Substring of the author's city"),
        BookCityQuery
    ),
    responses((status = 200, description = "Matching books", body = [BookWithAuthor]))
)]
pub async fn get_books_by_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(query): Query<BookCityQuery>,
) -> Result<Json<Vec<BookWithAuthor>>, ApiError> {
    let books = state
        .repo
        .find_books_by_author_city(&city, query.year_range())
        .await?;
    Ok(Json(books))
}

/// create_book
///
/// [Authenticated Route] Adds a book. An `authorId` with no matching author is
/// left for the store's foreign key to reject.
#[utoipa::path(
    post,
    path = "/api/books",
    request_body = CreateBookRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Created", body = Book),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_book(
    AuthUser { username }: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let Json(body) = body?;
    let payload: CreateBookRequest = validators::validated(body, BOOK_RULES)?;

    let book = state.repo.create_book(payload).await?;
    tracing::info!(%username, book_id = book.id, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// delete_book
///
/// [Authenticated Route] Removes a book.
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(("id" = i32, Path, description = "Book ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    AuthUser { username }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, BOOK_NOT_FOUND)?;
    if state.repo.delete_book(id).await? {
        tracing::info!(%username, book_id = id, "book deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(BOOK_NOT_FOUND))
    }
}
