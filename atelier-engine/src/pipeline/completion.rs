//! Completion detection
//!
//! After each slot persists, the detector re-derives the project state
//! from storage: the project moves to `completed` exactly when every
//! expected slot holds a blueprint with at least one analysis. The check
//! is idempotent, so concurrent slots racing through it converge on the
//! same terminal state.

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use atelier_common::Result;

use crate::branch::BranchManager;
use crate::db;
use crate::models::ProjectStatus;

/// Number of blueprint slots a project must fill before it completes.
pub const EXPECTED_SLOTS: u32 = 1;

/// Re-derive project completion from storage and advance the status when
/// every expected slot is filled. Returns `true` when the project is in
/// the completed state afterwards.
pub async fn check_and_advance(
    pool: &SqlitePool,
    branches: &BranchManager,
    project_id: Uuid,
) -> Result<bool> {
    let Some(project) = db::projects::load_project(pool, project_id).await? else {
        debug!(%project_id, "Completion check for unknown project, skipping");
        return Ok(false);
    };
    if project.status == ProjectStatus::Completed {
        return Ok(true);
    }

    let complete = if branches.is_degraded() {
        // All slots share the primary store in degraded mode.
        db::blueprints::project_subtree_complete(pool, project_id).await?
    } else {
        all_slots_filled(branches, project_id).await?
    };

    if !complete {
        return Ok(false);
    }

    // A project already in a terminal state (e.g. a slot raced into
    // error) keeps it; the guarded write refuses the transition.
    let advanced =
        db::projects::transition_status(pool, project_id, ProjectStatus::Completed).await?;
    if advanced {
        info!(%project_id, "All blueprint slots filled, project completed");
    }
    Ok(advanced)
}

async fn all_slots_filled(branches: &BranchManager, project_id: Uuid) -> Result<bool> {
    for slot in 0..EXPECTED_SLOTS {
        let Some(handle) = branches.resolve_for_read(project_id, slot).await else {
            debug!(%project_id, slot, "Slot store not yet produced");
            return Ok(false);
        };
        if !db::blueprints::has_blueprint(&handle.pool).await? {
            debug!(%project_id, slot, "Slot store has no blueprint yet");
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Analysis, Blueprint, Persona, Project};

    async fn memory_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        pool
    }

    fn degraded_manager(pool: SqlitePool) -> BranchManager {
        BranchManager::new(std::path::PathBuf::from("/nonexistent"), pool, None, None)
    }

    #[tokio::test]
    async fn incomplete_project_stays_processing() {
        let pool = memory_pool().await;
        let branches = degraded_manager(pool.clone());
        let mut project = Project::new("A brief".into());
        project.status = ProjectStatus::Processing;
        db::projects::create_project(&pool, &project).await.unwrap();

        let done = check_and_advance(&pool, &branches, project.id).await.unwrap();

        assert!(!done);
        let loaded = db::projects::load_project(&pool, project.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ProjectStatus::Processing);
    }

    #[tokio::test]
    async fn filled_slot_completes_project() {
        let pool = memory_pool().await;
        let branches = degraded_manager(pool.clone());
        let mut project = Project::new("A brief".into());
        project.status = ProjectStatus::Processing;
        db::projects::create_project(&pool, &project).await.unwrap();

        let mut blueprint =
            Blueprint::new(project.id, "Design".into(), "Desc".into(), vec![], vec![]);
        blueprint.analyses.push(Analysis::new(
            blueprint.id,
            "Security".into(),
            "A concern".into(),
            5,
            Persona::Systems,
        ));
        db::blueprints::save_blueprint_with_analyses(&pool, &blueprint)
            .await
            .unwrap();

        let done = check_and_advance(&pool, &branches, project.id).await.unwrap();

        assert!(done);
        let loaded = db::projects::load_project(&pool, project.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ProjectStatus::Completed);
    }

    #[tokio::test]
    async fn errored_project_is_not_resurrected() {
        let pool = memory_pool().await;
        let branches = degraded_manager(pool.clone());
        let mut project = Project::new("A brief".into());
        project.status = ProjectStatus::Error;
        db::projects::create_project(&pool, &project).await.unwrap();

        // The subtree is complete, but error is terminal
        let mut blueprint =
            Blueprint::new(project.id, "Design".into(), "Desc".into(), vec![], vec![]);
        blueprint.analyses.push(Analysis::new(
            blueprint.id,
            "Security".into(),
            "A concern".into(),
            5,
            Persona::Systems,
        ));
        db::blueprints::save_blueprint_with_analyses(&pool, &blueprint)
            .await
            .unwrap();

        let done = check_and_advance(&pool, &branches, project.id).await.unwrap();

        assert!(!done);
        let loaded = db::projects::load_project(&pool, project.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ProjectStatus::Error);
    }

    #[tokio::test]
    async fn completed_project_check_is_idempotent() {
        let pool = memory_pool().await;
        let branches = degraded_manager(pool.clone());
        let mut project = Project::new("A brief".into());
        project.status = ProjectStatus::Completed;
        db::projects::create_project(&pool, &project).await.unwrap();

        // No blueprints exist, but a terminal project is never re-derived.
        assert!(check_and_advance(&pool, &branches, project.id).await.unwrap());
        assert!(check_and_advance(&pool, &branches, project.id).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_project_is_not_completed() {
        let pool = memory_pool().await;
        let branches = degraded_manager(pool.clone());
        assert!(!check_and_advance(&pool, &branches, Uuid::new_v4()).await.unwrap());
    }
}
