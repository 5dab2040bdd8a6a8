//! atelier-engine library interface
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod branch;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod search;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::branch::BranchManager;
use crate::pipeline::BlueprintDraft;
use crate::provider::GenerationProvider;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Primary database connection pool
    pub db: SqlitePool,
    /// Branch manager for per-slot store resolution
    pub branches: BranchManager,
    /// Generation collaborator
    pub provider: Arc<dyn GenerationProvider>,
    /// Background slot tasks per project, for deterministic test awaiting
    pub tasks: Arc<RwLock<HashMap<Uuid, Vec<JoinHandle<()>>>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        branches: BranchManager,
        provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            db,
            branches,
            provider,
            tasks: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
        }
    }

    /// Spawn the background pipeline for one blueprint slot.
    pub async fn spawn_slot(&self, project_id: Uuid, slot: u32, draft: BlueprintDraft) {
        let handle = tokio::spawn(pipeline::run_slot(
            self.db.clone(),
            self.branches.clone(),
            self.provider.clone(),
            project_id,
            slot,
            draft,
        ));
        self.tasks
            .write()
            .await
            .entry(project_id)
            .or_default()
            .push(handle);
    }

    /// Wait for all background tasks of a project to finish.
    ///
    /// Used by tests and the delete path; a no-op when nothing is running.
    pub async fn await_project(&self, project_id: Uuid) {
        let handles = self.tasks.write().await.remove(&project_id);
        if let Some(handles) = handles {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(%project_id, "Slot task panicked: {}", e);
                }
            }
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::project_routes())
        .merge(api::health_routes())
        .with_state(state)
}
