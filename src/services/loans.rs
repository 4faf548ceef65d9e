//! Loan management service

use chrono::{NaiveDate, Utc};

use crate::{error::AppResult, models::LoanDetails, repository::Repository};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Latest loan of each book the user borrowed
    pub async fn latest_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.latest_per_book(user_id).await
    }

    /// One of the user's own loans
    pub async fn get_loan(&self, user_id: i32, loan_id: i32) -> AppResult<LoanDetails> {
        self.repository.loans.get_for_user(user_id, loan_id).await
    }

    /// Borrow a book
    pub async fn create_loan(&self, user_id: i32, book_id: i32) -> AppResult<LoanDetails> {
        let loan = self
            .repository
            .loans
            .open(user_id, book_id, Self::today())
            .await
            .map_err(|e| {
                tracing::info!(user_id, book_id, "Loan refused: {}", e);
                e
            })?;

        tracing::info!(user_id, book_id, loan_id = loan.id, "Book borrowed");
        Ok(loan)
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, user_id: i32, book_id: i32) -> AppResult<LoanDetails> {
        let loan = self
            .repository
            .loans
            .close(user_id, book_id, Self::today())
            .await
            .map_err(|e| {
                tracing::info!(user_id, book_id, "Return refused: {}", e);
                e
            })?;

        tracing::info!(user_id, book_id, loan_id = loan.id, "Book returned");
        Ok(loan)
    }
}
