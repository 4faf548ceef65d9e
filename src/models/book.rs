//! Book (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Catalog entry with its available stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    /// Optional description or summary
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    pub publication_year: i32,
    /// Number of copies currently on the shelf
    pub stock: i32,
}

/// Create / full update request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Author must be 1 to 100 characters"))]
    pub author: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[validate(range(min = 1, message = "Publication year must be positive"))]
    pub publication_year: i32,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
}

/// Partial update request. Absent fields are left untouched; an explicit
/// `"abstract": null` clears the abstract.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Author must be 1 to 100 characters"))]
    pub author: Option<String>,
    #[serde(
        rename = "abstract",
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<String>)]
    pub abstract_text: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "Publication year must be positive"))]
    pub publication_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
}

impl From<BookInput> for BookPatch {
    fn from(input: BookInput) -> Self {
        Self {
            title: Some(input.title),
            author: Some(input.author),
            abstract_text: Some(input.abstract_text),
            publication_year: Some(input.publication_year),
            stock: Some(input.stock),
        }
    }
}

impl BookPatch {
    /// Apply the patch onto an existing record
    pub fn apply(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(ref abstract_text) = self.abstract_text {
            book.abstract_text = abstract_text.clone();
        }
        if let Some(year) = self.publication_year {
            book.publication_year = year;
        }
        if let Some(stock) = self.stock {
            book.stock = stock;
        }
    }
}
