//! Borrow and return request models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{BorrowStatus, EquipmentStatus, ReturnStatus};

/// Borrow request record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub equipment_id: i32,
    pub user_id: i32,
    /// Requested start of the lending window
    pub borrow_time: DateTime<Utc>,
    /// Requested end of the lending window
    pub expected_return_time: DateTime<Utc>,
    pub note: Option<String>,
    pub status: BorrowStatus,
    /// Reviewer comment, mandatory on rejection
    pub decision_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Return request record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReturnRequest {
    pub id: i32,
    pub borrow_request_id: i32,
    pub equipment_id: i32,
    pub user_id: i32,
    /// When the borrower says the equipment came back
    pub return_time: DateTime<Utc>,
    pub status: ReturnStatus,
    pub decision_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new borrow request
#[derive(Debug, Clone)]
pub struct NewBorrowRequest {
    pub equipment_id: i32,
    pub user_id: i32,
    pub borrow_time: DateTime<Utc>,
    pub expected_return_time: DateTime<Utc>,
    pub note: Option<String>,
}

/// Insert payload for a new return request
#[derive(Debug, Clone)]
pub struct NewReturnRequest {
    pub borrow_request_id: i32,
    pub equipment_id: i32,
    pub user_id: i32,
    pub return_time: DateTime<Utc>,
}

/// Reviewer verdict on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// Borrow request with equipment and borrower details, for review queues
/// and history listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequestDetails {
    pub id: i32,
    pub equipment_id: i32,
    pub equipment_code: String,
    pub equipment_name: String,
    pub user_id: i32,
    pub username: String,
    pub borrow_time: DateTime<Utc>,
    pub expected_return_time: DateTime<Utc>,
    pub note: Option<String>,
    pub status: BorrowStatus,
    pub decision_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Return request with equipment and borrower details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReturnRequestDetails {
    pub id: i32,
    pub borrow_request_id: i32,
    pub equipment_id: i32,
    pub equipment_code: String,
    pub equipment_name: String,
    pub user_id: i32,
    pub username: String,
    pub return_time: DateTime<Utc>,
    pub status: ReturnStatus,
    pub decision_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Approved borrow past its expected return time
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OverdueBorrow {
    pub borrow_request_id: i32,
    pub equipment_id: i32,
    pub equipment_code: String,
    pub equipment_name: String,
    pub user_id: i32,
    pub username: String,
    pub expected_return_time: DateTime<Utc>,
}

/// Snapshot of one equipment row as seen by status reconciliation
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentLendingState {
    pub equipment_id: i32,
    pub code: String,
    pub status: EquipmentStatus,
    /// True when an approved borrow without an approved return exists
    pub has_active_borrow: bool,
}

/// One correction applied by status reconciliation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCorrection {
    pub equipment_id: i32,
    pub equipment_code: String,
    pub from: EquipmentStatus,
    pub to: EquipmentStatus,
}
