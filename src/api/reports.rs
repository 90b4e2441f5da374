//! Reporting endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{lending::OverdueBorrow, maintenance::MaintenancePlanDetails},
};

use super::AuthenticatedUser;

/// One labelled counter in a report
#[derive(Serialize, ToSchema)]
pub struct StatEntry {
    /// Label
    pub label: String,
    /// Value
    pub value: i64,
}

/// Usage rate of one piece of equipment
#[derive(Serialize, ToSchema)]
pub struct UsageRateEntry {
    /// Equipment ID
    pub equipment_id: i32,
    /// Inventory code
    pub equipment_code: String,
    /// Equipment name
    pub equipment_name: String,
    /// Total seconds spent on loan
    pub borrowed_seconds: f64,
    /// Seconds on loan over seconds since purchase
    pub usage_rate: f64,
}

/// Query parameters for the maintenance due report
#[derive(Debug, Deserialize)]
pub struct MaintenanceDueQuery {
    /// Look-ahead window in days (default: 7)
    pub days: Option<i64>,
}

/// Equipment count per status
#[utoipa::path(
    get,
    path = "/reports/equipment-status",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Counts per status", body = Vec<StatEntry>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn equipment_status_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<StatEntry>>> {
    claims.require_admin()?;

    let entries = state.services.reports.equipment_status_report().await?;
    Ok(Json(entries))
}

/// Maintenance plans due within the look-ahead window
#[utoipa::path(
    get,
    path = "/reports/maintenance-due",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(
        ("days" = Option<i64>, Query, description = "Look-ahead window in days (default: 7)")
    ),
    responses(
        (status = 200, description = "Plans due", body = Vec<MaintenancePlanDetails>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn maintenance_due_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MaintenanceDueQuery>,
) -> AppResult<Json<Vec<MaintenancePlanDetails>>> {
    claims.require_admin()?;

    let plans = state
        .services
        .reports
        .maintenance_due_report(query.days)
        .await?;
    Ok(Json(plans))
}

/// Approved borrows past their expected return time
#[utoipa::path(
    get,
    path = "/reports/overdue",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue borrows", body = Vec<OverdueBorrow>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn overdue_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<OverdueBorrow>>> {
    claims.require_admin()?;

    let overdue = state.services.reports.overdue_report().await?;
    Ok(Json(overdue))
}

/// Usage rate per equipment since purchase
#[utoipa::path(
    get,
    path = "/reports/usage",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Usage rates", body = Vec<UsageRateEntry>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn usage_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<UsageRateEntry>>> {
    claims.require_admin()?;

    let rates = state.services.reports.usage_report().await?;
    Ok(Json(rates))
}
