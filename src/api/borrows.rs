//! Borrow request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::lending::{BorrowRequest, BorrowRequestDetails, Decision, ReturnRequest},
};

use super::{equipment::PaginatedResponse, AuthenticatedUser};

/// Submit a borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowRequest {
    /// Inventory code of the equipment to borrow
    pub equipment_code: String,
    /// Start of the borrow window
    pub borrow_time: DateTime<Utc>,
    /// When the equipment is expected back
    pub expected_return_time: DateTime<Utc>,
    /// Free-form note for the reviewer
    pub note: Option<String>,
}

/// Reviewer decision on a pending request
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionRequest {
    /// approve or reject
    pub decision: Decision,
    /// Required when rejecting
    pub reason: Option<String>,
}

/// Submit a return for an approved borrow
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReturnRequest {
    /// When the equipment was handed back (defaults to now)
    pub return_time: Option<DateTime<Utc>>,
}

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Submit a borrow request for available equipment
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Borrow request submitted", body = BorrowRequest),
        (status = 400, description = "Invalid borrow window"),
        (status = 404, description = "Equipment not found"),
        (status = 409, description = "Equipment not available")
    )
)]
pub async fn create_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    claims.require_user()?;

    if request.expected_return_time <= request.borrow_time {
        return Err(AppError::Validation(
            "Expected return time must be after the borrow time".to_string(),
        ));
    }

    let borrow = state
        .services
        .lending
        .submit_borrow_request(
            claims.user_id,
            &request.equipment_code,
            request.borrow_time,
            request.expected_return_time,
            request.note,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Borrow history of the authenticated user
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<i64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Borrow history", body = PaginatedResponse<BorrowRequestDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_my_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowRequestDetails>>> {
    claims.require_user()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let (items, total) = state
        .services
        .lending
        .user_borrows(claims.user_id, page, per_page)
        .await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page,
        per_page,
    }))
}

/// Review queue of pending borrow requests
#[utoipa::path(
    get,
    path = "/borrows/pending",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending borrow requests", body = Vec<BorrowRequestDetails>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn pending_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequestDetails>>> {
    claims.require_admin()?;

    let pending = state.services.lending.pending_borrows().await?;
    Ok(Json(pending))
}

/// Approve or reject a pending borrow request
#[utoipa::path(
    post,
    path = "/borrows/{id}/decision",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision applied", body = BorrowRequest),
        (status = 400, description = "Missing rejection reason"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided or equipment taken")
    )
)]
pub async fn decide_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<DecisionRequest>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_admin()?;

    let borrow = state
        .services
        .lending
        .decide_borrow_request(id, request.decision, request.reason.as_deref())
        .await?;

    Ok(Json(borrow))
}

/// Submit a return for an approved borrow
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow request ID")),
    request_body = CreateReturnRequest,
    responses(
        (status = 201, description = "Return request submitted", body = ReturnRequest),
        (status = 403, description = "Borrow belongs to another user"),
        (status = 404, description = "Borrow request not found"),
        (status = 409, description = "Borrow is not active")
    )
)]
pub async fn create_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CreateReturnRequest>,
) -> AppResult<(StatusCode, Json<ReturnRequest>)> {
    claims.require_user()?;

    let return_time = request.return_time.unwrap_or_else(Utc::now);
    let ret = state
        .services
        .lending
        .submit_return_request(claims.user_id, id, return_time)
        .await?;

    Ok((StatusCode::CREATED, Json(ret)))
}
