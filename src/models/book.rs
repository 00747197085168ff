//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::borrow::ActiveBorrower;

/// Book model from database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author_id: i32,
    pub category_id: i32,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog listing entry with the author and category names joined in
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub author: String,
    pub category: String,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
}

/// Book title/author/isbn fields embedded in borrow records
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookBrief {
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// Single book view: bibliographic data plus its unreturned loans
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: BookSummary,
    /// Borrow records that are still out (active or overdue)
    pub borrow_records: Vec<ActiveBorrower>,
}

/// Catalog query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Filter by category name (case-insensitive contains)
    pub category: Option<String>,
    /// Filter by author name (case-insensitive contains)
    pub author: Option<String>,
    /// Case-insensitive match across title, author name and description
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Create book request (staff only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: String,
    #[validate(length(min = 10, max = 20, message = "ISBN must be 10-20 characters"))]
    pub isbn: String,
    pub author_id: i32,
    pub category_id: i32,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "At least one copy is required"))]
    pub total_copies: Option<i32>,
}

/// Update book request (staff only)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: Option<String>,
    pub author_id: Option<i32>,
    pub category_id: Option<i32>,
    pub published_year: Option<i32>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Copy count cannot be negative"))]
    pub total_copies: Option<i32>,
    #[validate(range(min = 0, message = "Copy count cannot be negative"))]
    pub available_copies: Option<i32>,
}
