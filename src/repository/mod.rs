//! Repository layer for database operations
//!
//! Each aggregate is reached through a trait so the services run unchanged on
//! PostgreSQL or on the in-memory store.

pub mod books;
pub mod loans;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BookInput, BookPatch, LoanDetails, Role, User},
};

#[async_trait]
pub trait BookRepository: Send + Sync {
    /// All books, ordered by id
    async fn list(&self) -> AppResult<Vec<Book>>;
    async fn get_by_id(&self, id: i32) -> AppResult<Book>;
    async fn create(&self, book: &BookInput) -> AppResult<Book>;
    /// Apply a partial update in a single write
    async fn update(&self, id: i32, patch: &BookPatch) -> AppResult<Book>;
    /// Delete a book and, by cascade, its loans
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Most recent loan of each book the user ever borrowed, newest first
    async fn latest_per_book(&self, user_id: i32) -> AppResult<Vec<LoanDetails>>;
    async fn get_for_user(&self, user_id: i32, loan_id: i32) -> AppResult<LoanDetails>;
    /// Check availability, record the loan and take one copy off the shelf,
    /// all or nothing
    async fn open(&self, user_id: i32, book_id: i32, today: NaiveDate) -> AppResult<LoanDetails>;
    /// Close the open loan and put the copy back on the shelf, all or nothing
    async fn close(&self, user_id: i32, book_id: i32, today: NaiveDate) -> AppResult<LoanDetails>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<User>;
    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn create(&self, username: &str, password_hash: &str, role: Role) -> AppResult<User>;
}

#[derive(Clone)]
enum Backend {
    Postgres(Pool<Postgres>),
    Memory,
}

/// Main repository struct holding one handle per aggregate
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookRepository>,
    pub loans: Arc<dyn LoanRepository>,
    pub users: Arc<dyn UserRepository>,
    backend: Backend,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgBookRepository::new(pool.clone())),
            loans: Arc::new(loans::PgLoanRepository::new(pool.clone())),
            users: Arc::new(users::PgUserRepository::new(pool.clone())),
            backend: Backend::Postgres(pool),
        }
    }

    /// Create a repository backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            books: Arc::new(store.clone()),
            loans: Arc::new(store.clone()),
            users: Arc::new(store),
            backend: Backend::Memory,
        }
    }

    /// Check that the underlying store answers
    pub async fn ping(&self) -> AppResult<()> {
        match &self.backend {
            Backend::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            Backend::Memory => Ok(()),
        }
    }
}
