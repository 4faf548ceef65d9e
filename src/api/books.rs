//! Book (catalog) endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{Book, BookInput, BookPatch},
    AppState,
};

use super::{ApiJson, ApiPath, AuthenticatedUser};

/// List all books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of books", body = Vec<Book>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(book): ApiJson<BookInput>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_admin()?;

    let created = state.services.catalog.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(book): ApiJson<BookInput>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;

    let updated = state.services.catalog.update_book(id, book).await?;
    Ok(Json(updated))
}

/// Update some fields of a book
#[utoipa::path(
    patch,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookPatch,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn patch_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(patch): ApiJson<BookPatch>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;

    let updated = state.services.catalog.patch_book(id, patch).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
