//! Borrowing service: the borrow/return state machine and fines

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        borrow::{BorrowDetails, BorrowHistoryEntry, BorrowHistoryQuery, BorrowRequest, BorrowStatus},
        user::BorrowerSummary,
        User,
    },
    repository::Repository,
};

/// Fine owed for a record returned at `returned_at`: each started day past
/// the due date is charged at the daily rate, never negative.
pub fn compute_fine(
    due_date: DateTime<Utc>,
    returned_at: DateTime<Utc>,
    daily_rate: Decimal,
) -> Decimal {
    let overdue_seconds = returned_at.signed_duration_since(due_date).num_seconds();
    if overdue_seconds <= 0 {
        return Decimal::ZERO;
    }
    let days_overdue = (overdue_seconds + 86_399) / 86_400;
    Decimal::from(days_overdue) * daily_rate
}

/// Human-readable fine string: "$5.00" or "No fine"
pub fn fine_display(fine: Decimal) -> String {
    if fine > Decimal::ZERO {
        format!("${:.2}", fine)
    } else {
        "No fine".to_string()
    }
}

#[derive(Clone)]
pub struct BorrowingService {
    repository: Repository,
    config: LoansConfig,
}

impl BorrowingService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Borrow a book: one ACTIVE record per (user, book), one copy taken
    /// off the shelf in the same transaction.
    pub async fn borrow(&self, request: BorrowRequest) -> AppResult<BorrowDetails> {
        let user = self.repository.users.get_by_id(request.user_id).await?;
        let book = self.repository.books.get_by_id(request.book_id).await?;

        if book.available_copies <= 0 {
            return Err(AppError::BadRequest(
                "Book is not available for borrowing".to_string(),
            ));
        }

        if self
            .repository
            .borrows
            .has_active(request.user_id, request.book_id)
            .await?
        {
            return Err(AppError::BadRequest(
                "User already has this book borrowed".to_string(),
            ));
        }

        let due_date = request
            .due_date
            .unwrap_or_else(|| Utc::now() + Duration::days(self.config.period_days));

        let record = self
            .repository
            .borrows
            .create(request.user_id, request.book_id, due_date)
            .await?;

        tracing::info!(
            borrow_id = record.id,
            user_id = user.id,
            book_id = book.id,
            "book borrowed"
        );

        let brief = self.repository.books.get_brief(book.id).await?;
        Ok(BorrowDetails::from_parts(record, borrower_summary(&user), brief))
    }

    /// Return a borrowed book, computing the fine from the elapsed days
    /// past due. Returns the updated record and a fine string.
    pub async fn return_borrow(&self, borrow_id: i32) -> AppResult<(BorrowDetails, String)> {
        let record = self.repository.borrows.get_by_id(borrow_id).await?;

        if record.status == BorrowStatus::Returned {
            return Err(AppError::BadRequest("Book already returned".to_string()));
        }

        let fine = compute_fine(record.due_date, Utc::now(), self.config.daily_fine);

        let updated = self
            .repository
            .borrows
            .mark_returned(borrow_id, fine)
            .await?
            // A concurrent return slipped in between the read and the update.
            .ok_or_else(|| AppError::BadRequest("Book already returned".to_string()))?;

        tracing::info!(
            borrow_id = updated.id,
            book_id = updated.book_id,
            %fine,
            "book returned"
        );

        let user = self.repository.users.get_by_id(updated.user_id).await?;
        let brief = self.repository.books.get_brief(updated.book_id).await?;
        let details = BorrowDetails::from_parts(updated, borrower_summary(&user), brief);

        Ok((details, fine_display(fine)))
    }

    /// Borrowing history for a user, newest first
    pub async fn history(
        &self,
        user_id: i32,
        query: &BorrowHistoryQuery,
    ) -> AppResult<(Vec<BorrowHistoryEntry>, i64)> {
        // Verify the user exists before paging their records
        self.repository.users.get_by_id(user_id).await?;
        self.repository.borrows.history(user_id, query).await
    }
}

fn borrower_summary(user: &User) -> BorrowerSummary {
    BorrowerSummary {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rate() -> Decimal {
        Decimal::new(100, 2) // 1.00 per day
    }

    #[test]
    fn five_days_late_is_five_dollars() {
        let due = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let returned = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(compute_fine(due, returned, rate()), Decimal::new(500, 2));
    }

    #[test]
    fn on_time_return_has_no_fine() {
        let due = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        assert_eq!(compute_fine(due, early, rate()), Decimal::ZERO);
        assert_eq!(compute_fine(due, due, rate()), Decimal::ZERO);
    }

    #[test]
    fn partial_days_round_up() {
        let due = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let returned = Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap();
        assert_eq!(compute_fine(due, returned, rate()), Decimal::new(100, 2));

        let returned = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(compute_fine(due, returned, rate()), Decimal::new(600, 2));
    }

    #[test]
    fn fine_rate_scales() {
        let due = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let returned = Utc.with_ymd_and_hms(2024, 1, 13, 0, 0, 0).unwrap();
        let fifty_cents = Decimal::new(50, 2);
        assert_eq!(
            compute_fine(due, returned, fifty_cents),
            Decimal::new(150, 2)
        );
    }

    #[test]
    fn fine_display_formats_money() {
        assert_eq!(fine_display(Decimal::new(500, 2)), "$5.00");
        assert_eq!(fine_display(Decimal::new(150, 2)), "$1.50");
        assert_eq!(fine_display(Decimal::ZERO), "No fine");
    }
}
