//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, borrows, equipment, health, maintenance, notifications, reports, returns, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LabTrack API",
        version = "1.0.0",
        description = "Laboratory Equipment Lending and Maintenance REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "LabTrack Team", email = "dev@labtrack.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::change_equipment_status,
        equipment::equipment_maintenance,
        equipment::reconcile_equipment,
        // Borrows
        borrows::create_borrow,
        borrows::list_my_borrows,
        borrows::pending_borrows,
        borrows::decide_borrow,
        borrows::create_return,
        // Returns
        returns::pending_returns,
        returns::decide_return,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        // Notifications
        notifications::list_notifications,
        notifications::unread_count,
        notifications::delete_notification,
        // Maintenance
        maintenance::list_plans,
        maintenance::get_plan,
        maintenance::create_plan,
        maintenance::update_plan,
        maintenance::delete_plan,
        // Reports
        reports::equipment_status_report,
        reports::maintenance_due_report,
        reports::overdue_report,
        reports::usage_report,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            // Equipment
            crate::models::enums::EquipmentStatus,
            crate::models::equipment::Equipment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::ChangeEquipmentStatus,
            equipment::ReconcileResponse,
            // Lending
            crate::models::enums::BorrowStatus,
            crate::models::enums::ReturnStatus,
            crate::models::lending::BorrowRequest,
            crate::models::lending::BorrowRequestDetails,
            crate::models::lending::ReturnRequest,
            crate::models::lending::ReturnRequestDetails,
            crate::models::lending::OverdueBorrow,
            crate::models::lending::StatusCorrection,
            crate::models::lending::Decision,
            borrows::CreateBorrowRequest,
            borrows::DecisionRequest,
            borrows::CreateReturnRequest,
            // Users
            crate::models::user::Role,
            crate::models::user::User,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            // Notifications
            crate::models::notification::NotificationKind,
            crate::models::notification::Notification,
            notifications::UnreadCountResponse,
            // Maintenance
            crate::models::maintenance::MaintenancePlan,
            crate::models::maintenance::MaintenancePlanDetails,
            crate::models::maintenance::CreateMaintenancePlan,
            crate::models::maintenance::UpdateMaintenancePlan,
            // Reports
            reports::StatEntry,
            reports::UsageRateEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "equipment", description = "Equipment inventory management"),
        (name = "borrows", description = "Borrow request lifecycle"),
        (name = "returns", description = "Return request lifecycle"),
        (name = "users", description = "User management"),
        (name = "notifications", description = "User notifications"),
        (name = "maintenance", description = "Maintenance planning"),
        (name = "reports", description = "Reports and statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
