//! Equipment model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::EquipmentStatus;

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    /// Inventory code, unique across the lab (e.g. "EQ001")
    pub code: String,
    pub name: String,
    pub model: Option<String>,
    /// Owning department or lab group
    pub department: Option<String>,
    pub price: Option<f64>,
    pub purchase_date: Option<NaiveDate>,
    pub status: EquipmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 64, message = "Code must be 1-64 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 128, message = "Name must be 1-128 characters"))]
    pub name: String,
    pub model: Option<String>,
    pub department: Option<String>,
    pub price: Option<f64>,
    pub purchase_date: Option<NaiveDate>,
}

/// Update equipment request (descriptive fields only, the code is immutable
/// and the status has its own endpoint)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 128, message = "Name must be 1-128 characters"))]
    pub name: Option<String>,
    pub model: Option<String>,
    pub department: Option<String>,
    pub price: Option<f64>,
    pub purchase_date: Option<NaiveDate>,
}

/// Manual status change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeEquipmentStatus {
    pub status: EquipmentStatus,
}

/// Equipment list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentQuery {
    /// Filter by status
    pub status: Option<EquipmentStatus>,
    /// Filter by department
    pub department: Option<String>,
    /// Search in code and name
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
