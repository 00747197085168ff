//! Borrow record model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::book::BookBrief;
use super::user::BorrowerSummary;

/// Borrow record status. ACTIVE and RETURNED are the stored states;
/// OVERDUE is derived from the due date at read time and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum BorrowStatus {
    Active,
    Returned,
    Overdue,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Active => "ACTIVE",
            BorrowStatus::Returned => "RETURNED",
            BorrowStatus::Overdue => "OVERDUE",
        }
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(BorrowStatus::Active),
            "RETURNED" => Ok(BorrowStatus::Returned),
            "OVERDUE" => Ok(BorrowStatus::Overdue),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

// SQLx conversion for BorrowStatus (stored as TEXT)
impl sqlx::Type<Postgres> for BorrowStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for BorrowStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BorrowStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Borrow record from database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    #[schema(value_type = Option<String>)]
    pub fine_amount: Option<Decimal>,
}

impl BorrowRecord {
    /// Effective status at `now`: an unreturned record whose due date has
    /// passed reads as OVERDUE without ever being stored that way.
    pub fn effective_status(&self, now: DateTime<Utc>) -> BorrowStatus {
        match self.status {
            BorrowStatus::Active if self.due_date < now => BorrowStatus::Overdue,
            other => other,
        }
    }
}

/// Borrow record with embedded user and book summaries, as returned by
/// the borrow and return endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowDetails {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    #[schema(value_type = Option<String>)]
    pub fine_amount: Option<Decimal>,
    pub user: BorrowerSummary,
    pub book: BookBrief,
}

impl BorrowDetails {
    pub fn from_parts(record: BorrowRecord, user: BorrowerSummary, book: BookBrief) -> Self {
        let now = Utc::now();
        Self {
            id: record.id,
            user_id: record.user_id,
            book_id: record.book_id,
            borrowed_at: record.borrowed_at,
            due_date: record.due_date,
            returned_at: record.returned_at,
            status: record.effective_status(now),
            fine_amount: record.fine_amount,
            user,
            book,
        }
    }
}

/// Unreturned loan as embedded in a book detail view
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActiveBorrower {
    pub id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: BorrowStatus,
    pub user: BorrowerSummary,
}

/// Borrow history entry with the book summary joined in
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowHistoryEntry {
    pub id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    #[schema(value_type = Option<String>)]
    pub fine_amount: Option<Decimal>,
    pub book: HistoryBook,
}

/// Book fields embedded in a history entry
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct HistoryBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
}

/// Borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BorrowRequest {
    #[validate(range(min = 1, message = "user_id must be a positive integer"))]
    pub user_id: i32,
    #[validate(range(min = 1, message = "book_id must be a positive integer"))]
    pub book_id: i32,
    /// Defaults to now + the configured loan period
    pub due_date: Option<DateTime<Utc>>,
}

/// Return request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnRequest {
    #[validate(range(min = 1, message = "borrow_id must be a positive integer"))]
    pub borrow_id: i32,
}

/// Borrow history query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BorrowHistoryQuery {
    /// active | returned | overdue; omitted means all records
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(status: BorrowStatus, due: DateTime<Utc>) -> BorrowRecord {
        BorrowRecord {
            id: 1,
            user_id: 1,
            book_id: 1,
            borrowed_at: due - Duration::days(14),
            due_date: due,
            returned_at: None,
            status,
            fine_amount: None,
        }
    }

    #[test]
    fn status_round_trip() {
        for s in ["ACTIVE", "RETURNED", "OVERDUE"] {
            let parsed: BorrowStatus = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert_eq!("active".parse::<BorrowStatus>(), Ok(BorrowStatus::Active));
        assert!("LOST".parse::<BorrowStatus>().is_err());
    }

    #[test]
    fn overdue_is_derived_from_due_date() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let past_due = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let not_due = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();

        assert_eq!(
            record(BorrowStatus::Active, past_due).effective_status(now),
            BorrowStatus::Overdue
        );
        assert_eq!(
            record(BorrowStatus::Active, not_due).effective_status(now),
            BorrowStatus::Active
        );
        // A returned record never reads as overdue
        assert_eq!(
            record(BorrowStatus::Returned, past_due).effective_status(now),
            BorrowStatus::Returned
        );
    }
}
