//! Loan (borrow) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Loan record from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BookLoan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub loan_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl BookLoan {
    /// A loan stays open until it has a return date
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

/// Loan joined with the borrowed book, as exposed by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_author: String,
    pub loan_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}
