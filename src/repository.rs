use crate::models::{
    Author, AuthorWithBooks, Book, BookWithAuthor, CreateAuthorRequest, CreateBookRequest,
    UpdateAuthorRequest, YearRange,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool, query_builder::QueryBuilder};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;

/// RepositoryError
///
/// A failed persistence call. The display string is what the client sees in
/// the 500 body, so it is the store's own message.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    /// A constraint the store would reject, raised by stores that check it themselves.
    #[error("{0}")]
    Integrity(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract behind every route. Handlers only see
/// `Arc<dyn Repository>`, so the Postgres store and the in-memory store are
/// interchangeable.
///
/// **Send + Sync + async_trait** are required for the trait object to cross
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Authors ---
    async fn list_authors(&self) -> RepoResult<Vec<Author>>;
    // Case-insensitive substring match on `city`.
    async fn find_authors_by_city(&self, city: &str) -> RepoResult<Vec<Author>>;
    async fn get_author(&self, id: i32) -> RepoResult<Option<Author>>;
    // Author plus its books in one round trip.
    async fn get_author_with_books(&self, id: i32) -> RepoResult<Option<AuthorWithBooks>>;
    async fn create_author(&self, req: CreateAuthorRequest) -> RepoResult<Author>;
    // Merges only the fields present in `req`. `None` when the author does not exist.
    async fn update_author(&self, id: i32, req: UpdateAuthorRequest) -> RepoResult<Option<Author>>;

    // --- Books ---
    async fn list_books(&self) -> RepoResult<Vec<Book>>;
    // Books whose author's city contains `city`, optionally limited to an inclusive year range.
    async fn find_books_by_author_city(
        &self,
        city: &str,
        years: Option<YearRange>,
    ) -> RepoResult<Vec<BookWithAuthor>>;
    async fn create_book(&self, req: CreateBookRequest) -> RepoResult<Book>;
    // Returns true if a row was deleted, false if no book had that id.
    async fn delete_book(&self, id: i32) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Escapes LIKE metacharacters so user input matches literally, then wraps it
/// for a substring match.
pub fn like_pattern(input: &str) -> String {
    let mut pattern = String::with_capacity(input.len() + 2);
    pattern.push('%');
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// --- Postgres ---

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Flat row of `authors LEFT JOIN books`; book columns are null for an author without books.
#[derive(FromRow)]
struct AuthorBookRow {
    id: i32,
    name: String,
    born: Option<NaiveDate>,
    city: String,
    book_id: Option<i32>,
    title: Option<String>,
    year_published: Option<i32>,
    genre: Option<String>,
}

// Flat row of `books JOIN authors`.
#[derive(FromRow)]
struct BookAuthorRow {
    id: i32,
    title: String,
    author_id: i32,
    year_published: i32,
    genre: String,
    author_name: String,
    author_born: Option<NaiveDate>,
    author_city: String,
}

impl From<BookAuthorRow> for BookWithAuthor {
    fn from(row: BookAuthorRow) -> Self {
        BookWithAuthor {
            book: Book {
                id: row.id,
                title: row.title,
                author_id: row.author_id,
                year_published: row.year_published,
                genre: row.genre,
            },
            author: Author {
                id: row.author_id,
                name: row.author_name,
                born: row.author_born,
                city: row.author_city,
            },
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_authors(&self) -> RepoResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>("SELECT id, name, born, city FROM authors ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(authors)
    }

    async fn find_authors_by_city(&self, city: &str) -> RepoResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            "SELECT id, name, born, city FROM authors WHERE city ILIKE $1 ORDER BY id",
        )
        .bind(like_pattern(city))
        .fetch_all(&self.pool)
        .await?;
        Ok(authors)
    }

    async fn get_author(&self, id: i32) -> RepoResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>("SELECT id, name, born, city FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    /// get_author_with_books
    ///
    /// One LEFT JOIN query; the author columns repeat on every row and the book
    /// columns are folded into `books`.
    async fn get_author_with_books(&self, id: i32) -> RepoResult<Option<AuthorWithBooks>> {
        let rows = sqlx::query_as::<_, AuthorBookRow>(
            r#"
            SELECT
                a.id, a.name, a.born, a.city,
                b.id AS book_id, b.title, b.year_published, b.genre
            FROM authors a
            LEFT JOIN books b ON b.author_id = a.id
            WHERE a.id = $1
            ORDER BY b.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let Some(first) = rows.first() else {
            return Ok(None);
        };
        let author = Author {
            id: first.id,
            name: first.name.clone(),
            born: first.born,
            city: first.city.clone(),
        };

        let books = rows
            .into_iter()
            .filter_map(|row| {
                Some(Book {
                    id: row.book_id?,
                    title: row.title?,
                    author_id: row.id,
                    year_published: row.year_published?,
                    genre: row.genre?,
                })
            })
            .collect();

        Ok(Some(AuthorWithBooks { author, books }))
    }

    async fn create_author(&self, req: CreateAuthorRequest) -> RepoResult<Author> {
        let author = sqlx::query_as::<_, Author>(
            "INSERT INTO authors (name, born, city) VALUES ($1, $2, $3) RETURNING id, name, born, city",
        )
        .bind(req.name)
        .bind(req.born)
        .bind(req.city)
        .fetch_one(&self.pool)
        .await?;
        Ok(author)
    }

    /// update_author
    ///
    /// Uses `COALESCE` so that only the `Some` fields of `req` overwrite a column.
    /// `born` is nullable, so a flag tells "set (possibly to NULL)" from "keep".
    async fn update_author(&self, id: i32, req: UpdateAuthorRequest) -> RepoResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors
            SET name = COALESCE($2, name),
                born = CASE WHEN $3 THEN $4 ELSE born END,
                city = COALESCE($5, city)
            WHERE id = $1
            RETURNING id, name, born, city
            "#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.born.is_some())
        .bind(req.born.flatten())
        .bind(req.city)
        .fetch_optional(&self.pool)
        .await?;
        Ok(author)
    }

    async fn list_books(&self) -> RepoResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author_id, year_published, genre FROM books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    /// find_books_by_author_city
    ///
    /// Built with QueryBuilder so the optional year bounds stay parameterized.
    async fn find_books_by_author_city(
        &self,
        city: &str,
        years: Option<YearRange>,
    ) -> RepoResult<Vec<BookWithAuthor>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT
                b.id, b.title, b.author_id, b.year_published, b.genre,
                a.name AS author_name, a.born AS author_born, a.city AS author_city
            FROM books b
            JOIN authors a ON a.id = b.author_id
            WHERE a.city ILIKE "#,
        );
        builder.push_bind(like_pattern(city));

        if let Some(range) = years {
            builder.push(" AND b.year_published >= ");
            builder.push_bind(range.start);
            builder.push(" AND b.year_published <= ");
            builder.push_bind(range.end);
        }

        builder.push(" ORDER BY b.id");

        let rows = builder
            .build_query_as::<BookAuthorRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(BookWithAuthor::from).collect())
    }

    async fn create_book(&self, req: CreateBookRequest) -> RepoResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author_id, year_published, genre)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, author_id, year_published, genre
            "#,
        )
        .bind(req.title)
        .bind(req.author_id)
        .bind(req.year_published)
        .bind(req.genre)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    async fn delete_book(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-Memory ---

#[derive(Default)]
struct Tables {
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, Book>,
    next_author_id: i32,
    next_book_id: i32,
}

/// InMemoryRepository
///
/// A `Repository` kept in process memory. Used by the test suites and by local
/// runs that have no `DATABASE_URL`. It enforces the same foreign key as the
/// Postgres schema so that both stores fail the same way.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn city_matches(author: &Author, needle: &str) -> bool {
    author.city.to_lowercase().contains(needle)
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_authors(&self) -> RepoResult<Vec<Author>> {
        Ok(self.tables.read().await.authors.values().cloned().collect())
    }

    async fn find_authors_by_city(&self, city: &str) -> RepoResult<Vec<Author>> {
        let needle = city.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .authors
            .values()
            .filter(|a| city_matches(a, &needle))
            .cloned()
            .collect())
    }

    async fn get_author(&self, id: i32) -> RepoResult<Option<Author>> {
        Ok(self.tables.read().await.authors.get(&id).cloned())
    }

    async fn get_author_with_books(&self, id: i32) -> RepoResult<Option<AuthorWithBooks>> {
        let tables = self.tables.read().await;
        Ok(tables.authors.get(&id).map(|author| AuthorWithBooks {
            author: author.clone(),
            books: tables
                .books
                .values()
                .filter(|b| b.author_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn create_author(&self, req: CreateAuthorRequest) -> RepoResult<Author> {
        let mut tables = self.tables.write().await;
        tables.next_author_id += 1;
        let author = Author {
            id: tables.next_author_id,
            name: req.name,
            born: req.born,
            city: req.city,
        };
        tables.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: i32, req: UpdateAuthorRequest) -> RepoResult<Option<Author>> {
        let mut tables = self.tables.write().await;
        let Some(author) = tables.authors.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            author.name = name;
        }
        if let Some(born) = req.born {
            author.born = born;
        }
        if let Some(city) = req.city {
            author.city = city;
        }
        Ok(Some(author.clone()))
    }

    async fn list_books(&self) -> RepoResult<Vec<Book>> {
        Ok(self.tables.read().await.books.values().cloned().collect())
    }

    async fn find_books_by_author_city(
        &self,
        city: &str,
        years: Option<YearRange>,
    ) -> RepoResult<Vec<BookWithAuthor>> {
        let needle = city.to_lowercase();
        let tables = self.tables.read().await;
        Ok(tables
            .books
            .values()
            .filter(|b| years.is_none_or(|range| range.contains(b.year_published)))
            .filter_map(|b| {
                let author = tables.authors.get(&b.author_id)?;
                city_matches(author, &needle).then(|| BookWithAuthor {
                    book: b.clone(),
                    author: author.clone(),
                })
            })
            .collect())
    }

    async fn create_book(&self, req: CreateBookRequest) -> RepoResult<Book> {
        let mut tables = self.tables.write().await;
        if !tables.authors.contains_key(&req.author_id) {
            return Err(RepositoryError::Integrity(format!(
                "insert or update on table \"books\" violates foreign key constraint \"books_author_id_fkey\": Key (author_id)=({}) is not present in table \"authors\".",
                req.author_id
            )));
        }
        tables.next_book_id += 1;
        let book = Book {
            id: tables.next_book_id,
            title: req.title,
            author_id: req.author_id,
            year_published: req.year_published,
            genre: req.genre,
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn delete_book(&self, id: i32) -> RepoResult<bool> {
        Ok(self.tables.write().await.books.remove(&id).is_some())
    }
}
