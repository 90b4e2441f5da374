//! Notification center service
//!
//! Notifications are always stored in the database; forwarding by email
//! is best effort and only attempted for users with an address on file.

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::notification::{Notification, NotificationKind},
    repository::Repository,
    services::email::EmailService,
    services::lending::Notifier,
};

#[derive(Clone)]
pub struct NotificationsService {
    repository: Repository,
    email: EmailService,
}

impl NotificationsService {
    pub fn new(repository: Repository, email: EmailService) -> Self {
        Self { repository, email }
    }

    /// Store a notification and forward it by email when possible
    pub async fn create(
        &self,
        user_id: i32,
        equipment_id: Option<i32>,
        kind: NotificationKind,
        message: &str,
    ) -> AppResult<Notification> {
        let notification = self
            .repository
            .notifications
            .create(user_id, equipment_id, kind, message)
            .await?;

        if self.email.is_enabled() {
            let user = self.repository.users.get_by_id(user_id).await?;
            if let Some(email) = &user.email {
                if let Err(err) = self
                    .email
                    .send_notification(email, kind.subject(), message)
                    .await
                {
                    tracing::warn!(user_id, error = %err, "failed to forward notification by email");
                }
            }
        }

        Ok(notification)
    }

    /// One page of a user's notifications, newest first. Listed entries
    /// are marked read; the returned records keep the read flag they had
    /// before this call so clients can still highlight new ones.
    pub async fn list(
        &self,
        user_id: i32,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<Notification>, i64)> {
        let (notifications, total) = self
            .repository
            .notifications
            .list_for_user(user_id, page, per_page)
            .await?;

        let unread: Vec<i32> = notifications
            .iter()
            .filter(|n| !n.is_read)
            .map(|n| n.id)
            .collect();
        self.repository
            .notifications
            .mark_read(user_id, &unread)
            .await?;

        Ok((notifications, total))
    }

    /// Unread notification count
    pub async fn unread_count(&self, user_id: i32) -> AppResult<i64> {
        self.repository.notifications.unread_count(user_id).await
    }

    /// Soft delete one of the caller's notifications
    pub async fn delete(&self, user_id: i32, notification_id: i32) -> AppResult<()> {
        let notification = self
            .repository
            .notifications
            .get_by_id(notification_id)
            .await?;
        if notification.user_id != user_id {
            return Err(AppError::NotOwner(format!(
                "Notification {} belongs to another user",
                notification_id
            )));
        }
        self.repository.notifications.soft_delete(notification_id).await
    }
}

#[async_trait]
impl Notifier for NotificationsService {
    async fn notify(
        &self,
        user_id: i32,
        equipment_id: Option<i32>,
        kind: NotificationKind,
        message: &str,
    ) -> AppResult<()> {
        self.create(user_id, equipment_id, kind, message).await?;
        Ok(())
    }
}
