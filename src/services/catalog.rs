//! Catalog management service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{Book, BookInput, BookPatch},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List every book in the catalog
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a new book
    pub async fn create_book(&self, book: BookInput) -> AppResult<Book> {
        book.validate()?;
        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book created");
        Ok(created)
    }

    /// Replace every field of a book
    pub async fn update_book(&self, id: i32, book: BookInput) -> AppResult<Book> {
        book.validate()?;
        self.repository.books.update(id, &BookPatch::from(book)).await
    }

    /// Update only the fields present in the patch
    pub async fn patch_book(&self, id: i32, patch: BookPatch) -> AppResult<Book> {
        patch.validate()?;
        self.repository.books.update(id, &patch).await
    }

    /// Delete a book together with its loan history
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}
