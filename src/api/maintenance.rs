//! Maintenance plan endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::maintenance::{
        CreateMaintenancePlan, MaintenancePlan, MaintenancePlanDetails, UpdateMaintenancePlan,
    },
};

use super::AuthenticatedUser;

/// List all maintenance plans
#[utoipa::path(
    get,
    path = "/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Maintenance plans", body = Vec<MaintenancePlanDetails>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_plans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<MaintenancePlanDetails>>> {
    claims.require_admin()?;

    let plans = state.services.maintenance.list().await?;
    Ok(Json(plans))
}

/// Get a maintenance plan by ID
#[utoipa::path(
    get,
    path = "/maintenance/{id}",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Maintenance plan ID")),
    responses(
        (status = 200, description = "Maintenance plan", body = MaintenancePlan),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn get_plan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MaintenancePlan>> {
    claims.require_admin()?;

    let plan = state.services.maintenance.get_by_id(id).await?;
    Ok(Json(plan))
}

/// Create a maintenance plan
#[utoipa::path(
    post,
    path = "/maintenance",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    request_body = CreateMaintenancePlan,
    responses(
        (status = 201, description = "Plan created", body = MaintenancePlan),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn create_plan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateMaintenancePlan>,
) -> AppResult<(StatusCode, Json<MaintenancePlan>)> {
    claims.require_admin()?;

    let plan = state.services.maintenance.create(&data).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// Update a maintenance plan
#[utoipa::path(
    put,
    path = "/maintenance/{id}",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Maintenance plan ID")),
    request_body = UpdateMaintenancePlan,
    responses(
        (status = 200, description = "Plan updated", body = MaintenancePlan),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn update_plan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateMaintenancePlan>,
) -> AppResult<Json<MaintenancePlan>> {
    claims.require_admin()?;

    let plan = state.services.maintenance.update(id, &data).await?;
    Ok(Json(plan))
}

/// Delete a maintenance plan
#[utoipa::path(
    delete,
    path = "/maintenance/{id}",
    tag = "maintenance",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Maintenance plan ID")),
    responses(
        (status = 204, description = "Plan deleted"),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn delete_plan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.maintenance.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
