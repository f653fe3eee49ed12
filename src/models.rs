use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Catalog Schemas (Mapped to Database) ---

/// Author
///
/// A writer record from the `authors` table. One author owns zero or more books
/// through `books.author_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Author {
    // Generated by the store, never updated afterwards.
    pub id: i32,
    pub name: String,
    // Date of birth, `YYYY-MM-DD` on the wire.
    #[ts(type = "string | null")]
    pub born: Option<NaiveDate>,
    pub city: String,
}

/// Book
///
/// A catalog entry from the `books` table. JSON uses camelCase (`authorId`,
/// `yearPublished`) while the columns stay snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Book {
    pub id: i32,
    pub title: String,
    // FK to authors.id. Integrity is enforced by the store, not by the handlers.
    pub author_id: i32,
    pub year_published: i32,
    pub genre: String,
}

// --- Association Views ---

/// BookWithAuthor
///
/// A book with its owning author embedded under `author`, produced by the
/// city search in a single joined query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BookWithAuthor {
    #[serde(flatten)]
    pub book: Book,
    pub author: Author,
}

/// AuthorWithBooks
///
/// An author together with every book that references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Default)]
pub struct AuthorWithBooks {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<Book>,
}

/// YearRange
///
/// Inclusive bounds on `yearPublished` used by the book city search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// Builds a range only when both bounds parse as integers. Like a leading
    /// integer parse, trailing garbage is ignored (`"1900abc"` is 1900).
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Option<Self> {
        let start = leading_int(start?)?;
        let end = leading_int(end?)?;
        Some(Self { start, end })
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }
}

// Optional sign followed by at least one digit, after leading whitespace.
fn leading_int(raw: &str) -> Option<i32> {
    let raw = raw.trim_start();
    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let digits = unsigned.len() - unsigned.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let end = raw.len() - unsigned.len() + digits;
    raw[..end].parse().ok()
}

// --- Request Payloads (Input Schemas) ---

/// CreateAuthorRequest
///
/// Input payload for `POST /authors`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateAuthorRequest {
    pub name: String,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub born: Option<NaiveDate>,
    pub city: String,
}

/// UpdateAuthorRequest
///
/// Partial update payload for `PUT /authors/{id}`. Only the fields present in
/// the body are merged into the stored record. `born` distinguishes an absent
/// key (`None`, keep) from an explicit `null` (`Some(None)`, clear).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAuthorRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>, format = Date)]
    pub born: Option<Option<NaiveDate>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// CreateBookRequest
///
/// Input payload for `POST /books`. Checked by the book validator before it is
/// decoded.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateBookRequest {
    pub title: String,
    pub author_id: i32,
    /// Accepts a JSON number or a string holding an integer.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[ts(as = "i32")]
    pub year_published: i32,
    pub genre: String,
}

/// CreateAuthorBookRequest
///
/// Input payload for `POST /authors/{id}/books`; the author comes from the path.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateAuthorBookRequest {
    pub title: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[ts(as = "i32")]
    pub year_published: i32,
    pub genre: String,
}

impl CreateAuthorBookRequest {
    pub fn for_author(self, author_id: i32) -> CreateBookRequest {
        CreateBookRequest {
            title: self.title,
            author_id,
            year_published: self.year_published,
            genre: self.genre,
        }
    }
}

// --- Auth Schemas ---

/// LoginRequest
///
/// Credentials posted to `POST /login`. The password is compared in plaintext
/// against the configured user list and never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// LoginResponse
///
/// The signed bearer token issued on a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
}
