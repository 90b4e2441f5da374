//! Business logic services

pub mod email;
pub mod equipment;
pub mod lending;
pub mod maintenance;
pub mod notifications;
pub mod reminders;
pub mod reports;
pub mod users;

use std::sync::Arc;

use crate::{
    config::{AuthConfig, EmailConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub equipment: equipment::EquipmentService,
    pub lending: lending::LendingService,
    pub maintenance: maintenance::MaintenanceService,
    pub notifications: notifications::NotificationsService,
    pub reports: reports::ReportsService,
    pub email: email::EmailService,
}

impl Services {
    /// Create all services with the given repository
    pub async fn new(
        repository: Repository,
        auth_config: AuthConfig,
        email_config: EmailConfig,
    ) -> AppResult<Self> {
        let email = email::EmailService::new(email_config);
        let notifications =
            notifications::NotificationsService::new(repository.clone(), email.clone());
        // the lending service talks to persistence and delivery through
        // trait objects so its state machines stay testable in isolation
        let lending = lending::LendingService::new(
            Arc::new(repository.lending.clone()),
            Arc::new(notifications.clone()),
        );

        Ok(Self {
            users: users::UsersService::new(repository.clone(), auth_config),
            equipment: equipment::EquipmentService::new(repository.clone()),
            lending,
            maintenance: maintenance::MaintenanceService::new(repository.clone()),
            notifications,
            reports: reports::ReportsService::new(repository),
            email,
        })
    }
}
