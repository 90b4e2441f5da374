//! LabTrack Laboratory Equipment Management
//!
//! A Rust implementation of the LabTrack equipment lending server,
//! providing a REST JSON API for managing laboratory equipment, borrow
//! and return requests, and maintenance planning.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
