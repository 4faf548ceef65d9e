//! Loan management endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::LoanDetails,
    AppState,
};

use super::{ApiJson, ApiPath, AuthenticatedUser};

/// Book id as sent by clients: a number or its decimal text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BookIdField {
    Number(i64),
    Text(String),
}

/// Borrow / return request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanRequest {
    /// Book to borrow or return
    #[serde(default)]
    #[schema(value_type = Option<i32>)]
    pub book_id: Option<BookIdField>,
}

impl LoanRequest {
    /// Blank, zero and absent ids are all missing
    fn book_id(&self) -> AppResult<i32> {
        let required = || AppError::Validation("book_id is required".to_string());

        let id = match &self.book_id {
            None => return Err(required()),
            Some(BookIdField::Number(n)) => *n,
            Some(BookIdField::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(required());
                }
                text.parse::<i64>().map_err(|_| {
                    AppError::Validation(format!("book_id must be an integer, got {:?}", text))
                })?
            }
        };

        match id {
            0 => Err(required()),
            id => i32::try_from(id)
                .map_err(|_| AppError::NotFound(format!("Book with id {} not found", id))),
        }
    }
}

/// Latest loan of each book borrowed by the current user
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Most recent loan per book, newest first", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.latest_loans(claims.user_id).await?;
    Ok(Json(loans))
}

/// One of the current user's loans
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(loan_id): ApiPath<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(claims.user_id, loan_id).await?;
    Ok(Json(loan))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans/create-loan",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = LoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Missing book_id, book unavailable or already borrowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(request): ApiJson<LoanRequest>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let book_id = request.book_id()?;

    let loan = state.services.loans.create_loan(claims.user_id, book_id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/return-loan",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = LoanRequest,
    responses(
        (status = 200, description = "Book returned", body = LoanDetails),
        (status = 400, description = "Missing book_id or no open loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(request): ApiJson<LoanRequest>,
) -> AppResult<Json<LoanDetails>> {
    let book_id = request.book_id()?;

    let loan = state.services.loans.return_loan(claims.user_id, book_id).await?;
    Ok(Json(loan))
}
