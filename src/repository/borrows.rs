//! Borrow records repository for database operations

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::borrow::{
        BorrowHistoryEntry, BorrowHistoryQuery, BorrowRecord, BorrowStatus, HistoryBook,
    },
};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrow record by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>("SELECT * FROM borrow_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    /// Check whether the user already holds this book. Overdue loans are
    /// stored as ACTIVE, so the single check covers both.
    pub async fn has_active(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrow_records
                WHERE user_id = $1 AND book_id = $2 AND status = 'ACTIVE'
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a borrow record and take one copy off the shelf; both writes
    /// commit together or neither does. The decrement is guarded so that
    /// a race on the last copy surfaces as "not available" instead of a
    /// negative count.
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        due_date: DateTime<Utc>,
    ) -> AppResult<BorrowRecord> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            INSERT INTO borrow_records (user_id, book_id, borrowed_at, due_date, status)
            VALUES ($1, $2, $3, $4, 'ACTIVE')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        let updated = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies - 1
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Lost the race on the last copy; dropping the transaction
            // rolls the insert back.
            return Err(AppError::BadRequest(
                "Book is not available for borrowing".to_string(),
            ));
        }

        tx.commit().await?;

        Ok(record)
    }

    /// Close a borrow record and put the copy back; both writes commit
    /// together or neither does. Returns None if the record was already
    /// returned.
    pub async fn mark_returned(
        &self,
        id: i32,
        fine_amount: Decimal,
    ) -> AppResult<Option<BorrowRecord>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            UPDATE borrow_records
            SET status = 'RETURNED', returned_at = $1, fine_amount = $2
            WHERE id = $3 AND status != 'RETURNED'
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(fine_amount)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let record = match record {
            Some(record) => record,
            None => return Ok(None),
        };

        sqlx::query("UPDATE books SET available_copies = available_copies + 1 WHERE id = $1")
            .bind(record.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(record))
    }

    /// Borrowing history for a user with an optional status filter,
    /// newest first. `overdue` translates to unreturned-and-past-due
    /// since OVERDUE is never stored.
    pub async fn history(
        &self,
        user_id: i32,
        query: &BorrowHistoryQuery,
    ) -> AppResult<(Vec<BorrowHistoryEntry>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * limit;

        let status_filter = match query.status.as_deref() {
            None | Some("all") => String::new(),
            Some(status) => match status.to_uppercase().parse::<BorrowStatus>() {
                Ok(BorrowStatus::Overdue) => {
                    " AND br.status = 'ACTIVE' AND br.due_date < NOW()".to_string()
                }
                Ok(status) => format!(" AND br.status = '{}'", status.as_str()),
                Err(_) => {
                    return Err(AppError::Validation(format!(
                        "status: unknown status filter '{}'",
                        status
                    )))
                }
            },
        };

        let count_query = format!(
            "SELECT COUNT(*) FROM borrow_records br WHERE br.user_id = $1{}",
            status_filter
        );
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            r#"
            SELECT br.id, br.borrowed_at, br.due_date, br.returned_at,
                   br.status, br.fine_amount,
                   b.title, a.name AS author, b.isbn, c.name AS category
            FROM borrow_records br
            JOIN books b ON b.id = br.book_id
            JOIN authors a ON a.id = b.author_id
            JOIN categories c ON c.id = b.category_id
            WHERE br.user_id = $1{}
            ORDER BY br.borrowed_at DESC
            LIMIT {} OFFSET {}
            "#,
            status_filter, limit, offset
        );

        let rows = sqlx::query(&select_query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let now = Utc::now();

        let entries = rows
            .iter()
            .map(|row| {
                let due_date: DateTime<Utc> = row.get("due_date");
                let stored: BorrowStatus = row.get("status");
                let status = match stored {
                    BorrowStatus::Active if due_date < now => BorrowStatus::Overdue,
                    other => other,
                };
                BorrowHistoryEntry {
                    id: row.get("id"),
                    borrowed_at: row.get("borrowed_at"),
                    due_date,
                    returned_at: row.get("returned_at"),
                    status,
                    fine_amount: row.get("fine_amount"),
                    book: HistoryBook {
                        title: row.get("title"),
                        author: row.get("author"),
                        isbn: row.get("isbn"),
                        category: row.get("category"),
                    },
                }
            })
            .collect();

        Ok((entries, total))
    }
}
