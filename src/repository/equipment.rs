//! Equipment repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::enums::EquipmentStatus,
    models::equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
};

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List equipment with optional filters and pagination
    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<(Vec<Equipment>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        if query.department.is_some() {
            conditions.push(format!("department = ${}", idx));
            idx += 1;
        }
        if query.q.is_some() {
            conditions.push(format!("(code ILIKE ${} OR name ILIKE ${})", idx, idx));
            idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let search = query.q.as_ref().map(|q| format!("%{}%", q));

        let count_sql = format!("SELECT COUNT(*) FROM equipment {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(status) = query.status {
            count_query = count_query.bind(status);
        }
        if let Some(department) = &query.department {
            count_query = count_query.bind(department);
        }
        if let Some(search) = &search {
            count_query = count_query.bind(search);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let list_sql = format!(
            "SELECT * FROM equipment {} ORDER BY code LIMIT ${} OFFSET ${}",
            where_clause,
            idx,
            idx + 1
        );
        let mut list_query = sqlx::query_as::<_, Equipment>(&list_sql);
        if let Some(status) = query.status {
            list_query = list_query.bind(status);
        }
        if let Some(department) = &query.department {
            list_query = list_query.bind(department);
        }
        if let Some(search) = &search {
            list_query = list_query.bind(search);
        }
        let rows = list_query
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Check if an inventory code is already taken
    pub async fn code_exists(&self, code: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Create equipment, starting in the available state
    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (code, name, model, department, price, purchase_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&data.code)
        .bind(&data.name)
        .bind(&data.model)
        .bind(&data.department)
        .bind(data.price)
        .bind(data.purchase_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update descriptive fields. Unset fields keep their current value.
    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let now = Utc::now();
        let mut sets = vec!["updated_at = $2".to_string()];
        let mut idx = 3;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.model, "model");
        add_field!(data.department, "department");
        add_field!(data.price, "price");
        add_field!(data.purchase_date, "purchase_date");

        let sql = format!(
            "UPDATE equipment SET {} WHERE id = $1 RETURNING *",
            sets.join(", ")
        );

        let mut query = sqlx::query_as::<_, Equipment>(&sql).bind(id).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    query = query.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.model);
        bind_field!(data.department);
        bind_field!(data.price);
        bind_field!(data.purchase_date);

        query
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Atomic status transition. Returns false when the row was not in
    /// `from` anymore, in which case nothing was written.
    pub async fn transition_status(
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

    /// Status counts for the dashboard report
    pub async fn status_counts(&self) -> AppResult<Vec<(EquipmentStatus, i64)>> {
        let rows = sqlx::query_as::<_, (EquipmentStatus, i64)>(
            r#"
            SELECT status, COUNT(*) FROM equipment GROUP BY status ORDER BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
