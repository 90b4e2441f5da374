//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BorrowApproved,
    BorrowRejected,
    ReturnApproved,
    ReturnRejected,
    MaintenanceDue,
    LoanOverdue,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BorrowApproved => "borrow_approved",
            NotificationKind::BorrowRejected => "borrow_rejected",
            NotificationKind::ReturnApproved => "return_approved",
            NotificationKind::ReturnRejected => "return_rejected",
            NotificationKind::MaintenanceDue => "maintenance_due",
            NotificationKind::LoanOverdue => "loan_overdue",
        }
    }

    /// Subject line used when the notification is forwarded by email
    pub fn subject(&self) -> &'static str {
        match self {
            NotificationKind::BorrowApproved => "Borrow request approved",
            NotificationKind::BorrowRejected => "Borrow request rejected",
            NotificationKind::ReturnApproved => "Return confirmed",
            NotificationKind::ReturnRejected => "Return request rejected",
            NotificationKind::MaintenanceDue => "Equipment maintenance due",
            NotificationKind::LoanOverdue => "Equipment overdue",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "borrow_approved" => Ok(NotificationKind::BorrowApproved),
            "borrow_rejected" => Ok(NotificationKind::BorrowRejected),
            "return_approved" => Ok(NotificationKind::ReturnApproved),
            "return_rejected" => Ok(NotificationKind::ReturnRejected),
            "maintenance_due" => Ok(NotificationKind::MaintenanceDue),
            "loan_overdue" => Ok(NotificationKind::LoanOverdue),
            _ => Err(format!("Invalid notification kind: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for NotificationKind {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for NotificationKind {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for NotificationKind {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// In-app notification record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub equipment_id: Option<i32>,
    pub kind: NotificationKind,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub is_read: bool,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
}
