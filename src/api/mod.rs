//! API handlers for the REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    routing::{get, post},
    Router,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Cookie carrying the session JWT
pub const SESSION_COOKIE: &str = "sessionid";
/// Cookie carrying the CSRF token
pub const CSRF_COOKIE: &str = "csrftoken";
/// Header that must echo the CSRF cookie on cookie-authenticated writes
pub const CSRF_HEADER: &str = "x-csrftoken";

/// JSON body extractor whose rejections render as [`AppError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters whose rejections render as [`AppError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Extractor for the authenticated user.
///
/// Accepts a bearer token, or the session cookie set by the browsable pages.
/// Cookie-authenticated unsafe requests must pass the double-submit CSRF check.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Ok(TypedHeader(Authorization(bearer))) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
        {
            let claims = state.services.users.verify_token(bearer.token())?;
            return Ok(AuthenticatedUser(claims));
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| {
                AppError::Authentication("Authentication credentials were not provided".to_string())
            })?;

        let claims = state.services.users.verify_token(&token)?;

        if !parts.method.is_safe() {
            let header = parts
                .headers
                .get(CSRF_HEADER)
                .and_then(|value| value.to_str().ok());
            let cookie = jar.get(CSRF_COOKIE).map(|c| c.value());

            match (header, cookie) {
                (Some(header), Some(cookie)) if !cookie.is_empty() && header == cookie => {}
                _ => {
                    return Err(AppError::Authorization(
                        "CSRF token missing or incorrect".to_string(),
                    ))
                }
            }
        }

        Ok(AuthenticatedUser(claims))
    }
}

/// REST routes, mounted under `/api`
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Accounts
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .patch(books::patch_book)
                .delete(books::delete_book),
        )
        // Loans
        .route("/loans", get(loans::list_loans))
        .route("/loans/create-loan", post(loans::create_loan))
        .route("/loans/return-loan", post(loans::return_loan))
        .route("/loans/:id", get(loans::get_loan))
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found.".to_string())
}
