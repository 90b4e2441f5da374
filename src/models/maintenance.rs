//! Maintenance plan model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Maintenance plan for one piece of equipment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaintenancePlan {
    pub id: i32,
    pub equipment_id: i32,
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    /// What the maintenance consists of
    pub content: Option<String>,
    /// Username of the person in charge
    pub responsible: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create maintenance plan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMaintenancePlan {
    pub equipment_id: i32,
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    pub content: Option<String>,
    pub responsible: Option<String>,
}

/// Update maintenance plan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMaintenancePlan {
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    pub content: Option<String>,
    pub responsible: Option<String>,
}

/// Maintenance plan joined with its equipment, for listings and reports
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MaintenancePlanDetails {
    pub id: i32,
    pub equipment_id: i32,
    pub equipment_code: String,
    pub equipment_name: String,
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    pub content: Option<String>,
    pub responsible: Option<String>,
}
