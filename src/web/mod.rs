//! Browsable pages.
//!
//! The pages hold no business logic: they call the REST API through
//! [`client::ApiClient`], forwarding the visitor's session, and turn the
//! answers into flash messages.

pub mod client;
pub mod flash;
pub mod pages;
pub mod session;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/books", get(pages::loans))
        .route("/books/create", get(pages::create_book_form).post(pages::create_book))
        .route("/books/:id", get(pages::book_detail).post(pages::update_book))
        .route("/books/:id/borrow", post(pages::borrow_book))
        .route("/books/:id/return", post(pages::return_book))
        .route("/books/:id/delete", post(pages::delete_book))
        .route("/signup", get(pages::signup_form).post(pages::signup))
        .route("/signin", get(pages::signin_form).post(pages::signin))
        .route("/logout", get(pages::signout))
        .fallback(pages::not_found)
}
