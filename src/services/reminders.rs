//! Background sweep: status reconciliation, maintenance and overdue
//! reminders.
//!
//! The task ticks on a fixed interval. Reconciliation runs on every tick
//! (including the immediate first one, so a restart repairs drift right
//! away); reminders go out at most once per calendar day.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    config::RemindersConfig,
    error::AppResult,
    models::notification::NotificationKind,
    repository::Repository,
    services::Services,
};

pub struct ReminderTask {
    repository: Repository,
    services: Arc<Services>,
    config: RemindersConfig,
}

impl ReminderTask {
    pub fn new(repository: Repository, services: Arc<Services>, config: RemindersConfig) -> Self {
        Self {
            repository,
            services,
            config,
        }
    }

    pub async fn run(self) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.sweep_interval_secs.max(1)));
        let mut last_reminder_date: Option<NaiveDate> = None;

        loop {
            interval.tick().await;

            match self.services.lending.reconcile_equipment_status().await {
                Ok(corrections) if !corrections.is_empty() => {
                    tracing::info!(corrected = corrections.len(), "status reconciliation applied corrections");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "status reconciliation failed");
                }
            }

            let today = Utc::now().date_naive();
            if last_reminder_date != Some(today) {
                match self.send_reminders(today).await {
                    Ok(()) => last_reminder_date = Some(today),
                    Err(err) => {
                        tracing::error!(error = %err, "reminder sweep failed");
                    }
                }
            }
        }
    }

    async fn send_reminders(&self, today: NaiveDate) -> AppResult<()> {
        self.send_maintenance_reminders(today).await?;
        self.send_overdue_reminders(today).await?;
        Ok(())
    }

    /// Notify responsibles about plans due in `maintenance_lead_days` days
    async fn send_maintenance_reminders(&self, today: NaiveDate) -> AppResult<()> {
        let lead = self.config.maintenance_lead_days.max(0);
        let target = today + chrono::Duration::days(lead);
        let due = self.repository.maintenance.due_on(target).await?;

        for plan in due {
            let Some(responsible) = &plan.responsible else {
                continue;
            };
            match self.repository.users.get_by_username(responsible).await? {
                Some(user) => {
                    let message = format!(
                        "Equipment {} ({}) is due for maintenance on {}.",
                        plan.equipment_name, plan.equipment_code, target
                    );
                    if let Err(err) = self
                        .services
                        .notifications
                        .create(
                            user.id,
                            Some(plan.equipment_id),
                            NotificationKind::MaintenanceDue,
                            &message,
                        )
                        .await
                    {
                        tracing::warn!(plan_id = plan.id, error = %err, "failed to store maintenance reminder");
                    }
                }
                None => {
                    tracing::warn!(
                        plan_id = plan.id,
                        responsible = %responsible,
                        "maintenance responsible has no account, skipping reminder"
                    );
                }
            }
        }

        Ok(())
    }

    /// Notify borrowers whose expected return date slipped exactly
    /// `overdue_grace_days` days ago
    async fn send_overdue_reminders(&self, today: NaiveDate) -> AppResult<()> {
        let grace = self.config.overdue_grace_days.max(0);
        let now = Utc::now();

        for borrow in self.repository.lending.overdue_borrows(now).await? {
            if days_overdue(borrow.expected_return_time, today) != grace {
                continue;
            }
            let message = format!(
                "Equipment {} ({}) was due back on {} and is now overdue. Please return it as soon as possible.",
                borrow.equipment_name,
                borrow.equipment_code,
                borrow.expected_return_time.date_naive()
            );
            if let Err(err) = self
                .services
                .notifications
                .create(
                    borrow.user_id,
                    Some(borrow.equipment_id),
                    NotificationKind::LoanOverdue,
                    &message,
                )
                .await
            {
                tracing::warn!(
                    borrow_request_id = borrow.borrow_request_id,
                    error = %err,
                    "failed to store overdue reminder"
                );
            }
        }

        Ok(())
    }
}

/// Whole days between the expected return date and today, by calendar
/// date rather than 24 hour blocks
fn days_overdue(expected_return_time: DateTime<Utc>, today: NaiveDate) -> i64 {
    (today - expected_return_time.date_naive()).num_days()
}
