//! Equipment inventory service

use crate::{
    error::{AppError, AppResult},
    models::enums::EquipmentStatus,
    models::equipment::{CreateEquipment, Equipment, EquipmentQuery, UpdateEquipment},
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<(Vec<Equipment>, i64)> {
        self.repository.equipment.list(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        if self.repository.equipment.code_exists(&data.code).await? {
            return Err(AppError::Conflict(format!(
                "Equipment code {} already exists",
                data.code
            )));
        }
        let equipment = self.repository.equipment.create(data).await?;
        tracing::info!(equipment = %equipment.code, "equipment created");
        Ok(equipment)
    }

    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        self.repository.equipment.update(id, data).await
    }

    /// Manually move equipment between available and decommissioning.
    ///
    /// The borrowed status is owned by the lending lifecycle: it can
    /// neither be set nor cleared by hand, so manual edits cannot create
    /// equipment that looks free while a loan is active.
    pub async fn change_status(&self, id: i32, to: EquipmentStatus) -> AppResult<Equipment> {
        if to == EquipmentStatus::Borrowed {
            return Err(AppError::InvalidTransition(
                "Equipment cannot be marked borrowed manually".to_string(),
            ));
        }

        let equipment = self.repository.equipment.get_by_id(id).await?;
        if equipment.status == to {
            return Ok(equipment);
        }
        if equipment.status == EquipmentStatus::Borrowed {
            return Err(AppError::InvalidTransition(format!(
                "Equipment {} is borrowed, wait for the return to complete",
                equipment.code
            )));
        }

        let moved = self
            .repository
            .equipment
            .transition_status(id, equipment.status, to)
            .await?;
        if !moved {
            return Err(AppError::InvalidTransition(format!(
                "Equipment {} changed state concurrently",
                equipment.code
            )));
        }

        tracing::info!(equipment = %equipment.code, from = %equipment.status, to = %to, "equipment status changed");
        self.repository.equipment.get_by_id(id).await
    }
}
