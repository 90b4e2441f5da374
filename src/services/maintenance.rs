//! Maintenance plan service

use crate::{
    error::AppResult,
    models::maintenance::{
        CreateMaintenancePlan, MaintenancePlan, MaintenancePlanDetails, UpdateMaintenancePlan,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MaintenanceService {
    repository: Repository,
}

impl MaintenanceService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<MaintenancePlanDetails>> {
        self.repository.maintenance.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<MaintenancePlan> {
        self.repository.maintenance.get_by_id(id).await
    }

    pub async fn for_equipment(&self, equipment_id: i32) -> AppResult<Vec<MaintenancePlan>> {
        // surfaces NotFound for unknown equipment instead of an empty list
        self.repository.equipment.get_by_id(equipment_id).await?;
        self.repository.maintenance.for_equipment(equipment_id).await
    }

    pub async fn create(&self, data: &CreateMaintenancePlan) -> AppResult<MaintenancePlan> {
        self.repository.equipment.get_by_id(data.equipment_id).await?;
        let plan = self.repository.maintenance.create(data).await?;
        tracing::info!(plan_id = plan.id, equipment_id = plan.equipment_id, "maintenance plan created");
        Ok(plan)
    }

    pub async fn update(&self, id: i32, data: &UpdateMaintenancePlan) -> AppResult<MaintenancePlan> {
        self.repository.maintenance.update(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.maintenance.delete(id).await
    }
}
