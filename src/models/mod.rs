//! Data models for LabTrack

pub mod enums;
pub mod equipment;
pub mod lending;
pub mod maintenance;
pub mod notification;
pub mod user;

// Re-export commonly used types
pub use enums::{BorrowStatus, EquipmentStatus, ReturnStatus};
pub use equipment::Equipment;
pub use lending::{BorrowRequest, Decision, ReturnRequest, StatusCorrection};
pub use maintenance::MaintenancePlan;
pub use notification::{Notification, NotificationKind};
pub use user::{Role, User, UserClaims};
