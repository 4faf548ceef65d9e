//! Loans repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult, LoanError},
    models::LoanDetails,
};

use super::LoanRepository;

const LOAN_DETAILS_SELECT: &str = r#"
    SELECT l.id, l.book_id, b.title AS book_title, b.author AS book_author,
           l.loan_date, l.return_date
    FROM book_loans l
    JOIN books b ON b.id = l.book_id
"#;

#[derive(Clone)]
pub struct PgLoanRepository {
    pool: Pool<Postgres>,
}

impl PgLoanRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn details_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        loan_id: i32,
    ) -> AppResult<LoanDetails> {
        let details = sqlx::query_as::<_, LoanDetails>(&format!(
            "{} WHERE l.id = $1",
            LOAN_DETAILS_SELECT
        ))
        .bind(loan_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(details)
    }

    /// Lock the book row; every compound loan operation goes through here first
    async fn lock_book_stock(
        tx: &mut Transaction<'_, Postgres>,
        book_id: i32,
    ) -> AppResult<Option<i32>> {
        let stock = sqlx::query_scalar::<_, i32>("SELECT stock FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(stock)
    }
}

#[async_trait]
impl LoanRepository for PgLoanRepository {
    async fn latest_per_book(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let loans = sqlx::query_as::<_, LoanDetails>(
            r#"
            SELECT * FROM (
                SELECT DISTINCT ON (l.book_id)
                       l.id, l.book_id, b.title AS book_title, b.author AS book_author,
                       l.loan_date, l.return_date
                FROM book_loans l
                JOIN books b ON b.id = l.book_id
                WHERE l.user_id = $1
                ORDER BY l.book_id, l.loan_date DESC, l.id DESC
            ) latest
            ORDER BY latest.loan_date DESC, latest.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn get_for_user(&self, user_id: i32, loan_id: i32) -> AppResult<LoanDetails> {
        sqlx::query_as::<_, LoanDetails>(&format!(
            "{} WHERE l.id = $1 AND l.user_id = $2",
            LOAN_DETAILS_SELECT
        ))
        .bind(loan_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    async fn open(&self, user_id: i32, book_id: i32, today: NaiveDate) -> AppResult<LoanDetails> {
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on any early return rolls back
        let stock = Self::lock_book_stock(&mut tx, book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if stock < 1 {
            return Err(LoanError::Unavailable.into());
        }

        let already_borrowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM book_loans WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_borrowed {
            return Err(LoanError::AlreadyBorrowed.into());
        }

        let loan_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO book_loans (user_id, book_id, loan_date, return_date)
            VALUES ($1, $2, $3, NULL)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(today)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Loan(LoanError::AlreadyBorrowed)
            }
            other => AppError::Database(other),
        })?;

        sqlx::query("UPDATE books SET stock = stock - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let details = Self::details_in_tx(&mut tx, loan_id).await?;
        tx.commit().await?;

        Ok(details)
    }

    async fn close(&self, user_id: i32, book_id: i32, today: NaiveDate) -> AppResult<LoanDetails> {
        let mut tx = self.pool.begin().await?;

        // Same lock order as `open`: book row first, then the loan
        if Self::lock_book_stock(&mut tx, book_id).await?.is_none() {
            return Err(LoanError::NothingToReturn.into());
        }

        let loan_id = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT id FROM book_loans
            WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LoanError::NothingToReturn)?;

        sqlx::query("UPDATE book_loans SET return_date = $2 WHERE id = $1")
            .bind(loan_id)
            .bind(today)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE books SET stock = stock + 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let details = Self::details_in_tx(&mut tx, loan_id).await?;
        tx.commit().await?;

        Ok(details)
    }
}
