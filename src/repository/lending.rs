//! Lending repository: borrow and return requests plus the atomic
//! status transitions the lending service is built on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::enums::{BorrowStatus, EquipmentStatus, ReturnStatus},
    models::equipment::Equipment,
    models::lending::{
        BorrowRequest, BorrowRequestDetails, EquipmentLendingState, NewBorrowRequest,
        NewReturnRequest, OverdueBorrow, ReturnRequest, ReturnRequestDetails,
    },
};

/// Persistence operations the lending service depends on.
///
/// Every `transition_*` method is a compare-and-set: it moves a row from
/// `from` to `to` in one statement and reports through its return value
/// whether this call actually performed the move. Concurrent deciders
/// race on these; exactly one wins.
#[async_trait]
pub trait LendingStore: Send + Sync {
    async fn equipment_by_id(&self, id: i32) -> AppResult<Equipment>;
    async fn equipment_by_code(&self, code: &str) -> AppResult<Equipment>;
    async fn transition_equipment(
        &self,
        id: i32,
        from: EquipmentStatus,
        to: EquipmentStatus,
    ) -> AppResult<bool>;

    async fn insert_borrow(&self, new: &NewBorrowRequest) -> AppResult<BorrowRequest>;
    async fn borrow_by_id(&self, id: i32) -> AppResult<BorrowRequest>;
    async fn transition_borrow(
        &self,
        id: i32,
        from: BorrowStatus,
        to: BorrowStatus,
        reason: Option<&str>,
    ) -> AppResult<bool>;

    async fn insert_return(&self, new: &NewReturnRequest) -> AppResult<ReturnRequest>;
    async fn return_by_id(&self, id: i32) -> AppResult<ReturnRequest>;
    async fn transition_return(
        &self,
        id: i32,
        from: ReturnStatus,
        to: ReturnStatus,
        reason: Option<&str>,
    ) -> AppResult<bool>;

    /// Pending borrow requests with equipment and borrower details,
    /// oldest first (review queue order)
    async fn pending_borrows(&self) -> AppResult<Vec<BorrowRequestDetails>>;
    /// Pending return requests with equipment and borrower details
    async fn pending_returns(&self) -> AppResult<Vec<ReturnRequestDetails>>;
    /// Borrow history of one user, newest first, paginated
    async fn user_borrows(
        &self,
        user_id: i32,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)>;

    /// Snapshot of every equipment row with its derived lending state,
    /// used by status reconciliation.
    async fn lending_states(&self) -> AppResult<Vec<EquipmentLendingState>>;
}

#[derive(Clone)]
pub struct LendingRepository {
    pool: Pool<Postgres>,
}

impl LendingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Approved borrows whose expected return time has passed without an
    /// approved return
    pub async fn overdue_borrows(&self, as_of: DateTime<Utc>) -> AppResult<Vec<OverdueBorrow>> {
        let rows = sqlx::query_as::<_, OverdueBorrow>(
            r#"
            SELECT br.id AS borrow_request_id, br.equipment_id,
                   e.code AS equipment_code, e.name AS equipment_name,
                   br.user_id, u.username, br.expected_return_time
            FROM borrow_requests br
            JOIN equipment e ON e.id = br.equipment_id
            JOIN users u ON u.id = br.user_id
            WHERE br.status = 'approved'
              AND br.expected_return_time < $1
              AND NOT EXISTS (
                  SELECT 1 FROM return_requests rr
                  WHERE rr.borrow_request_id = br.id AND rr.status = 'approved'
              )
            ORDER BY br.expected_return_time
            "#,
        )
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl LendingStore for LendingRepository {
    async fn equipment_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    async fn equipment_by_code(&self, code: &str) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", code)))
    }

    async fn transition_equipment(
        &self,
        id: i32,
        from: EquipmentStatus,
        to: EquipmentStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE equipment
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_borrow(&self, new: &NewBorrowRequest) -> AppResult<BorrowRequest> {
        let row = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO borrow_requests
                (equipment_id, user_id, borrow_time, expected_return_time, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.equipment_id)
        .bind(new.user_id)
        .bind(new.borrow_time)
        .bind(new.expected_return_time)
        .bind(&new.note)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn borrow_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request {} not found", id)))
    }

    async fn transition_borrow(
        &self,
        id: i32,
        from: BorrowStatus,
        to: BorrowStatus,
        reason: Option<&str>,
    ) -> AppResult<bool> {
        // decided_at marks the reviewer decision: written when the request
        // leaves pending, cleared when a claim is reverted back to pending,
        // kept on later moves (approved to completed).
        let result = sqlx::query(
            r#"
            UPDATE borrow_requests
            SET status = $3,
                decision_reason = COALESCE($4, decision_reason),
                decided_at = CASE
                    WHEN $3 = 'pending' THEN NULL
                    WHEN status = 'pending' THEN NOW()
                    ELSE decided_at
                END
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_return(&self, new: &NewReturnRequest) -> AppResult<ReturnRequest> {
        let row = sqlx::query_as::<_, ReturnRequest>(
            r#"
            INSERT INTO return_requests
                (borrow_request_id, equipment_id, user_id, return_time)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.borrow_request_id)
        .bind(new.equipment_id)
        .bind(new.user_id)
        .bind(new.return_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn return_by_id(&self, id: i32) -> AppResult<ReturnRequest> {
        sqlx::query_as::<_, ReturnRequest>("SELECT * FROM return_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Return request {} not found", id)))
    }

    async fn transition_return(
        &self,
        id: i32,
        from: ReturnStatus,
        to: ReturnStatus,
        reason: Option<&str>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE return_requests
            SET status = $3,
                decision_reason = COALESCE($4, decision_reason),
                decided_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn pending_borrows(&self) -> AppResult<Vec<BorrowRequestDetails>> {
        let rows = sqlx::query_as::<_, BorrowRequestDetails>(
            r#"
            SELECT br.id, br.equipment_id, e.code AS equipment_code,
                   e.name AS equipment_name, br.user_id, u.username,
                   br.borrow_time, br.expected_return_time, br.note,
                   br.status, br.decision_reason, br.decided_at, br.created_at
            FROM borrow_requests br
            JOIN equipment e ON e.id = br.equipment_id
            JOIN users u ON u.id = br.user_id
            WHERE br.status = 'pending'
            ORDER BY br.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn pending_returns(&self) -> AppResult<Vec<ReturnRequestDetails>> {
        let rows = sqlx::query_as::<_, ReturnRequestDetails>(
            r#"
            SELECT rr.id, rr.borrow_request_id, rr.equipment_id,
                   e.code AS equipment_code, e.name AS equipment_name,
                   rr.user_id, u.username, rr.return_time,
                   rr.status, rr.decision_reason, rr.decided_at, rr.created_at
            FROM return_requests rr
            JOIN equipment e ON e.id = rr.equipment_id
            JOIN users u ON u.id = rr.user_id
            WHERE rr.status = 'pending'
            ORDER BY rr.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn user_borrows(
        &self,
        user_id: i32,
        page: i64,
        per_page: i64,
    ) -> AppResult<(Vec<BorrowRequestDetails>, i64)> {
        let offset = (page - 1) * per_page;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM borrow_requests WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, BorrowRequestDetails>(
            r#"
            SELECT br.id, br.equipment_id, e.code AS equipment_code,
                   e.name AS equipment_name, br.user_id, u.username,
                   br.borrow_time, br.expected_return_time, br.note,
                   br.status, br.decision_reason, br.decided_at, br.created_at
            FROM borrow_requests br
            JOIN equipment e ON e.id = br.equipment_id
            JOIN users u ON u.id = br.user_id
            WHERE br.user_id = $1
            ORDER BY br.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    async fn lending_states(&self) -> AppResult<Vec<EquipmentLendingState>> {
        let rows = sqlx::query_as::<_, EquipmentLendingState>(
            r#"
            SELECT e.id AS equipment_id, e.code, e.status,
                   EXISTS (
                       SELECT 1 FROM borrow_requests br
                       WHERE br.equipment_id = e.id
                         AND br.status = 'approved'
                         AND NOT EXISTS (
                             SELECT 1 FROM return_requests rr
                             WHERE rr.borrow_request_id = br.id
                               AND rr.status = 'approved'
                         )
                   ) AS has_active_borrow
            FROM equipment e
            ORDER BY e.code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
