//! Borrowing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::borrow::{
        BorrowDetails, BorrowHistoryEntry, BorrowHistoryQuery, BorrowRequest, ReturnRequest,
    },
};

use super::{books::PaginatedResponse, ApiJson, AuthenticatedUser};

/// Borrow response with the created record
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    pub borrow_record: BorrowDetails,
}

/// Return response with the closed record and the fine owed
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub message: String,
    pub borrow_record: BorrowDetails,
    /// "$5.00" or "No fine"
    pub fine: String,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 400, description = "No copies available or already borrowed"),
        (status = 404, description = "User or book not found")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    _user: AuthenticatedUser,
    ApiJson(request): ApiJson<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    request.validate()?;

    let record = state.services.borrowing.borrow(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            message: "Book borrowed successfully".to_string(),
            borrow_record: record,
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 400, description = "Already returned"),
        (status = 404, description = "Borrow record not found")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    _user: AuthenticatedUser,
    ApiJson(request): ApiJson<ReturnRequest>,
) -> AppResult<Json<ReturnResponse>> {
    request.validate()?;

    let (record, fine) = state.services.borrowing.return_borrow(request.borrow_id).await?;

    Ok(Json(ReturnResponse {
        message: "Book returned successfully".to_string(),
        borrow_record: record,
        fine,
    }))
}

/// Borrowing history for a user; members may only read their own
#[utoipa::path(
    get,
    path = "/my-borrows/{user_id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = i32, Path, description = "User ID"),
        ("status" = Option<String>, Query, description = "active | returned | overdue"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default: 10)")
    ),
    responses(
        (status = 200, description = "Page of borrow records", body = PaginatedResponse<BorrowHistoryEntry>),
        (status = 403, description = "Not the caller's own history"),
        (status = 404, description = "User not found")
    )
)]
pub async fn my_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(user_id): Path<i32>,
    Query(query): Query<BorrowHistoryQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowHistoryEntry>>> {
    if user.id != user_id && !user.membership_type.is_staff() {
        return Err(AppError::Authorization("Access denied".to_string()));
    }

    let (records, total) = state.services.borrowing.history(user_id, &query).await?;

    Ok(Json(PaginatedResponse::new(
        records,
        total,
        query.page.unwrap_or(1).max(1),
        query.limit.unwrap_or(10).clamp(1, 100),
    )))
}
