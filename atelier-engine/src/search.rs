//! Cross-branch search fan-out
//!
//! A search query is embedded once, then dispatched concurrently to every
//! readable store for the project. Per-store results keep their own
//! nearest-first order; stores are concatenated without any global
//! re-ranking. A failing store is logged and dropped rather than failing
//! the whole query.

use futures::future::join_all;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use atelier_common::{Error, Result};

use crate::branch::{BranchManager, StoreHandle};
use crate::db;
use crate::models::Analysis;
use crate::provider::GenerationProvider;

/// Upper bound on slot probing when enumerating branch stores
const MAX_PROBED_SLOTS: u32 = 10;

/// Search a project's findings across all of its readable stores.
pub async fn search_project(
    pool: &SqlitePool,
    branches: &BranchManager,
    provider: &dyn GenerationProvider,
    project_id: Uuid,
    query: &str,
) -> Result<Vec<Analysis>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::InvalidInput("Search query cannot be empty".into()));
    }

    if db::projects::load_project(pool, project_id).await?.is_none() {
        return Err(Error::NotFound(format!("Project {} not found", project_id)));
    }

    let embedding = provider
        .embed(query)
        .await
        .map_err(|e| Error::Internal(format!("Failed to embed search query: {}", e)))?
        .ok_or_else(|| {
            Error::InvalidInput("Search query produced no embedding".to_string())
        })?;

    let stores = enumerate_stores(branches, project_id).await;
    debug!(%project_id, stores = stores.len(), "Dispatching search fan-out");

    let futures = stores
        .iter()
        .map(|handle| db::search::hybrid_search(&handle.pool, query, &embedding));
    let mut results = Vec::new();
    for (handle, outcome) in stores.iter().zip(join_all(futures).await) {
        match outcome {
            Ok(matches) => results.extend(matches),
            Err(e) => {
                warn!(branch = %handle.branch, "Store search failed, dropping: {}", e);
            }
        }
    }
    Ok(results)
}

/// Resolve every readable store for the project.
///
/// Degraded mode collapses to the primary store. Otherwise slots are
/// probed in order until the first one whose branch was never produced.
/// When no slot resolves, the primary store is searched instead of
/// returning an empty store list: findings persisted during an earlier
/// degraded run stay reachable after a restart with branching enabled.
async fn enumerate_stores(branches: &BranchManager, project_id: Uuid) -> Vec<StoreHandle> {
    if branches.is_degraded() {
        return vec![branches.primary_handle()];
    }
    let mut stores = Vec::new();
    for slot in 0..MAX_PROBED_SLOTS {
        match branches.resolve_for_read(project_id, slot).await {
            Some(handle) => stores.push(handle),
            None => break,
        }
    }
    if stores.is_empty() {
        stores.push(branches.primary_handle());
    }
    stores
}
