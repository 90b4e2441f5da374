//! Maintenance plans repository

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::maintenance::{
        CreateMaintenancePlan, MaintenancePlan, MaintenancePlanDetails, UpdateMaintenancePlan,
    },
};

#[derive(Clone)]
pub struct MaintenanceRepository {
    pool: Pool<Postgres>,
}

impl MaintenanceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All plans with equipment details, next due first
    pub async fn list(&self) -> AppResult<Vec<MaintenancePlanDetails>> {
        let rows = sqlx::query_as::<_, MaintenancePlanDetails>(
            r#"
            SELECT mp.id, mp.equipment_id, e.code AS equipment_code,
                   e.name AS equipment_name, mp.last_maintenance,
                   mp.next_maintenance, mp.content, mp.responsible
            FROM maintenance_plans mp
            JOIN equipment e ON e.id = mp.equipment_id
            ORDER BY mp.next_maintenance NULLS LAST, mp.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Get plan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<MaintenancePlan> {
        sqlx::query_as::<_, MaintenancePlan>("SELECT * FROM maintenance_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance plan {} not found", id)))
    }

    /// Plans of one piece of equipment
    pub async fn for_equipment(&self, equipment_id: i32) -> AppResult<Vec<MaintenancePlan>> {
        let rows = sqlx::query_as::<_, MaintenancePlan>(
            r#"
            SELECT * FROM maintenance_plans
            WHERE equipment_id = $1
            ORDER BY next_maintenance NULLS LAST, id
            "#,
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a maintenance plan
    pub async fn create(&self, data: &CreateMaintenancePlan) -> AppResult<MaintenancePlan> {
        let row = sqlx::query_as::<_, MaintenancePlan>(
            r#"
            INSERT INTO maintenance_plans
                (equipment_id, last_maintenance, next_maintenance, content, responsible)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.equipment_id)
        .bind(data.last_maintenance)
        .bind(data.next_maintenance)
        .bind(&data.content)
        .bind(&data.responsible)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update a plan. Unset fields keep their current value.
    pub async fn update(&self, id: i32, data: &UpdateMaintenancePlan) -> AppResult<MaintenancePlan> {
        sqlx::query_as::<_, MaintenancePlan>(
            r#"
            UPDATE maintenance_plans
            SET last_maintenance = COALESCE($2, last_maintenance),
                next_maintenance = COALESCE($3, next_maintenance),
                content = COALESCE($4, content),
                responsible = COALESCE($5, responsible)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.last_maintenance)
        .bind(data.next_maintenance)
        .bind(&data.content)
        .bind(&data.responsible)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Maintenance plan {} not found", id)))
    }

    /// Delete a plan
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM maintenance_plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Maintenance plan {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Plans whose next maintenance falls exactly on `date` (reminder sweep)
    pub async fn due_on(&self, date: NaiveDate) -> AppResult<Vec<MaintenancePlanDetails>> {
        let rows = sqlx::query_as::<_, MaintenancePlanDetails>(
            r#"
            SELECT mp.id, mp.equipment_id, e.code AS equipment_code,
                   e.name AS equipment_name, mp.last_maintenance,
                   mp.next_maintenance, mp.content, mp.responsible
            FROM maintenance_plans mp
            JOIN equipment e ON e.id = mp.equipment_id
            WHERE mp.next_maintenance = $1
            ORDER BY mp.id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Plans due between `from` and `to` inclusive (report)
    pub async fn due_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<MaintenancePlanDetails>> {
        let rows = sqlx::query_as::<_, MaintenancePlanDetails>(
            r#"
            SELECT mp.id, mp.equipment_id, e.code AS equipment_code,
                   e.name AS equipment_name, mp.last_maintenance,
                   mp.next_maintenance, mp.content, mp.responsible
            FROM maintenance_plans mp
            JOIN equipment e ON e.id = mp.equipment_id
            WHERE mp.next_maintenance BETWEEN $1 AND $2
            ORDER BY mp.next_maintenance, mp.id
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
