//! Return request endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::lending::{ReturnRequest, ReturnRequestDetails},
};

use super::{borrows::DecisionRequest, AuthenticatedUser};

/// Review queue of pending return requests
#[utoipa::path(
    get,
    path = "/returns/pending",
    tag = "returns",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending return requests", body = Vec<ReturnRequestDetails>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn pending_returns(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReturnRequestDetails>>> {
    claims.require_admin()?;

    let pending = state.services.lending.pending_returns().await?;
    Ok(Json(pending))
}

/// Approve or reject a pending return request
#[utoipa::path(
    post,
    path = "/returns/{id}/decision",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Return request ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision applied", body = ReturnRequest),
        (status = 400, description = "Missing rejection reason"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided or borrow not active")
    )
)]
pub async fn decide_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<DecisionRequest>,
) -> AppResult<Json<ReturnRequest>> {
    claims.require_admin()?;

    let ret = state
        .services
        .lending
        .decide_return_request(id, request.decision, request.reason.as_deref())
        .await?;

    Ok(Json(ret))
}
