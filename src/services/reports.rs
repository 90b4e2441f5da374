//! Reporting service

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::Row;

use crate::{
    api::reports::{StatEntry, UsageRateEntry},
    error::AppResult,
    models::lending::OverdueBorrow,
    models::maintenance::MaintenancePlanDetails,
    repository::Repository,
};

/// Denominator used when the purchase date is missing or in the future
const FALLBACK_WINDOW_SECS: f64 = 30.0 * 24.0 * 3600.0;

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Equipment count per status
    pub async fn equipment_status_report(&self) -> AppResult<Vec<StatEntry>> {
        let counts = self.repository.equipment.status_counts().await?;
        Ok(counts
            .into_iter()
            .map(|(status, count)| StatEntry {
                label: status.to_string(),
                value: count,
            })
            .collect())
    }

    /// Maintenance plans due within the next `days` days
    pub async fn maintenance_due_report(
        &self,
        days: Option<i64>,
    ) -> AppResult<Vec<MaintenancePlanDetails>> {
        let days = days.unwrap_or(7).max(0);
        let today = Utc::now().date_naive();
        self.repository
            .maintenance
            .due_between(today, today + Duration::days(days))
            .await
    }

    /// Approved borrows past their expected return time
    pub async fn overdue_report(&self) -> AppResult<Vec<OverdueBorrow>> {
        self.repository.lending.overdue_borrows(Utc::now()).await
    }

    /// Usage rate per equipment: time spent on loan (approval to return
    /// approval, or now for running loans) over time since purchase.
    pub async fn usage_report(&self) -> AppResult<Vec<UsageRateEntry>> {
        let now = Utc::now();
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.code, e.name, e.purchase_date,
                   COALESCE(SUM(EXTRACT(EPOCH FROM
                       (COALESCE(rr.decided_at, NOW()) - br.decided_at))), 0)::double precision
                       AS borrowed_seconds
            FROM equipment e
            LEFT JOIN borrow_requests br
                   ON br.equipment_id = e.id
                  AND br.status IN ('approved', 'completed')
                  AND br.decided_at IS NOT NULL
            LEFT JOIN return_requests rr
                   ON rr.borrow_request_id = br.id
                  AND rr.status = 'approved'
            GROUP BY e.id, e.code, e.name, e.purchase_date
            ORDER BY e.code
            "#,
        )
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let borrowed_seconds: f64 = row.get("borrowed_seconds");
                let purchase_date: Option<NaiveDate> = row.get("purchase_date");
                UsageRateEntry {
                    equipment_id: row.get("id"),
                    equipment_code: row.get("code"),
                    equipment_name: row.get("name"),
                    borrowed_seconds,
                    usage_rate: usage_ratio(borrowed_seconds, purchase_date, now),
                }
            })
            .collect())
    }
}

/// Borrowed time over owned time. Equipment without a purchase date (or
/// purchased "in the future" through a data entry error) is measured
/// against a 30 day window instead.
fn usage_ratio(borrowed_seconds: f64, purchase_date: Option<NaiveDate>, now: DateTime<Utc>) -> f64 {
    let owned_seconds = purchase_date
        .map(|date| {
            let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
            (now - start).num_seconds() as f64
        })
        .filter(|secs| *secs > 0.0)
        .unwrap_or(FALLBACK_WINDOW_SECS);

    borrowed_seconds / owned_seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_ratio_against_purchase_age() {
        let now = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
        let purchase = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        // owned 10 days, borrowed 1 day
        let ratio = usage_ratio(24.0 * 3600.0, Some(purchase), now);
        assert!((ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn usage_ratio_falls_back_without_purchase_date() {
        let now = Utc::now();
        let ratio = usage_ratio(3.0 * 24.0 * 3600.0, None, now);
        assert!((ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn usage_ratio_falls_back_for_future_purchase_date() {
        let now = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
        let purchase = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let ratio = usage_ratio(3.0 * 24.0 * 3600.0, Some(purchase), now);
        assert!((ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn usage_ratio_zero_when_never_borrowed() {
        assert_eq!(usage_ratio(0.0, None, Utc::now()), 0.0);
    }
}
