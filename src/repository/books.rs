//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookInput, BookPatch},
};

use super::BookRepository;

const BOOK_COLUMNS: &str = "id, title, author, abstract_text, publication_year, stock";

#[derive(Clone)]
pub struct PgBookRepository {
    pool: Pool<Postgres>,
}

impl PgBookRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY id",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn create(&self, book: &BookInput) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, abstract_text, publication_year, stock)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.abstract_text)
        .bind(book.publication_year)
        .bind(book.stock)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, id: i32, patch: &BookPatch) -> AppResult<Book> {
        // Untouched columns keep their current value, so a concurrent loan's
        // stock change survives a patch that does not name `stock`.
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                abstract_text = CASE WHEN $4 THEN $5 ELSE abstract_text END,
                publication_year = COALESCE($6, publication_year),
                stock = COALESCE($7, stock)
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.author)
        .bind(patch.abstract_text.is_some())
        .bind(patch.abstract_text.clone().flatten())
        .bind(patch.publication_year)
        .bind(patch.stock)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }
}
