//! Storage branch management
//!
//! Each blueprint slot gets an isolated storage branch named
//! `project_{id}_blueprint_{slot}`. Branch creation is delegated to an
//! out-of-process backend CLI; any failure there flips a process-wide
//! degraded flag and every subsequent resolution collapses to the
//! primary store. The flag is one-way: once branching is known broken,
//! it is never re-probed for the lifetime of the process.

use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use uuid::Uuid;

use crate::db;

/// Sentinel branch name for the primary store
pub const PRIMARY_BRANCH: &str = "__primary__";

/// A resolved store: either the primary database or one branch
#[derive(Clone)]
pub struct StoreHandle {
    /// Branch name, or [`PRIMARY_BRANCH`]
    pub branch: String,
    /// Connection pool for this store
    pub pool: SqlitePool,
}

impl StoreHandle {
    pub fn is_primary(&self) -> bool {
        self.branch == PRIMARY_BRANCH
    }
}

/// Branch manager with sticky primary-store fallback
#[derive(Clone)]
pub struct BranchManager {
    data_dir: PathBuf,
    branch_cli: Option<PathBuf>,
    service_id: Option<String>,
    primary: SqlitePool,
    degraded: Arc<AtomicBool>,
}

impl BranchManager {
    /// Create a branch manager
    ///
    /// Enters degraded mode immediately when the branch CLI was not
    /// found at startup or no parent service identifier is configured.
    pub fn new(
        data_dir: PathBuf,
        primary: SqlitePool,
        branch_cli: Option<PathBuf>,
        service_id: Option<String>,
    ) -> Self {
        let service_id = service_id.filter(|s| !s.trim().is_empty());
        let degraded = branch_cli.is_none() || service_id.is_none();
        if degraded {
            tracing::warn!(
                "Branch backend unavailable or unconfigured; all slots will use the primary store"
            );
        }

        Self {
            data_dir,
            branch_cli,
            service_id,
            primary,
            degraded: Arc::new(AtomicBool::new(degraded)),
        }
    }

    /// Whether every resolution currently collapses to the primary store
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Deterministic branch name for a project slot
    pub fn branch_name(project_id: Uuid, slot: u32) -> String {
        format!("project_{}_blueprint_{}", project_id, slot)
    }

    /// Database file backing a branch
    pub fn branch_db_path(&self, branch: &str) -> PathBuf {
        self.data_dir.join("branches").join(format!("{}.db", branch))
    }

    /// Handle to the primary store
    pub fn primary_handle(&self) -> StoreHandle {
        StoreHandle {
            branch: PRIMARY_BRANCH.to_string(),
            pool: self.primary.clone(),
        }
    }

    /// One-way switch into degraded mode
    ///
    /// Concurrent callers racing to set the flag are harmless: every
    /// write stores the same value.
    fn mark_degraded(&self, reason: &str) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                reason,
                "Entering degraded mode; branching disabled for the remaining process lifetime"
            );
        }
    }

    /// Create (or fall back for) the branch of a project slot
    ///
    /// Never fails: every branch-backend failure is absorbed into
    /// degraded mode and the primary store is returned instead.
    pub async fn create_branch(&self, project_id: Uuid, slot: u32) -> StoreHandle {
        if self.is_degraded() {
            tracing::debug!(
                project_id = %project_id,
                slot,
                "Degraded mode active, using primary store"
            );
            return self.primary_handle();
        }

        // Both are present when not degraded; construction guarantees it
        let (cli, service_id) = match (&self.branch_cli, &self.service_id) {
            (Some(cli), Some(service_id)) => (cli.clone(), service_id.clone()),
            _ => {
                self.mark_degraded("branch backend unconfigured");
                return self.primary_handle();
            }
        };

        let branch = Self::branch_name(project_id, slot);

        match self.invoke_fork_tool(&cli, &service_id, &branch).await {
            Ok(()) => {}
            Err(reason) => {
                self.mark_degraded(&reason);
                return self.primary_handle();
            }
        }

        let db_path = self.branch_db_path(&branch);
        match db::open_branch_pool(&db_path).await {
            Ok(pool) => {
                tracing::info!(
                    project_id = %project_id,
                    slot,
                    branch = %branch,
                    "Storage branch created"
                );
                StoreHandle { branch, pool }
            }
            Err(e) => {
                self.mark_degraded(&format!("failed to open branch database: {}", e));
                self.primary_handle()
            }
        }
    }

    /// Resolve the branch of a slot for reading
    ///
    /// Returns `None` when the branch does not exist yet; callers treat
    /// that as "slot not yet produced", not as an error. In degraded
    /// mode the primary store always resolves.
    pub async fn resolve_for_read(&self, project_id: Uuid, slot: u32) -> Option<StoreHandle> {
        if self.is_degraded() {
            return Some(self.primary_handle());
        }

        let branch = Self::branch_name(project_id, slot);
        let db_path = self.branch_db_path(&branch);

        match db::open_branch_existing(&db_path).await {
            Ok(pool) => Some(StoreHandle { branch, pool }),
            Err(e) => {
                tracing::debug!(
                    project_id = %project_id,
                    slot,
                    branch = %branch,
                    error = %e,
                    "Branch not resolvable, treating slot as not yet produced"
                );
                None
            }
        }
    }

    /// Best-effort removal of a slot's branch database (project deletion)
    pub fn remove_branch_file(&self, project_id: Uuid, slot: u32) {
        let branch = Self::branch_name(project_id, slot);
        let db_path = self.branch_db_path(&branch);
        if db_path.exists() {
            if let Err(e) = std::fs::remove_file(&db_path) {
                tracing::warn!(branch = %branch, error = %e, "Failed to remove branch database");
            }
        }
    }

    /// Invoke the out-of-process branch backend
    ///
    /// Returns the failure reason when the tool is missing, exits
    /// non-zero, or reports an authentication problem.
    async fn invoke_fork_tool(
        &self,
        cli: &Path,
        service_id: &str,
        branch: &str,
    ) -> Result<(), String> {
        let output = Command::new(cli)
            .arg("service")
            .arg("fork")
            .arg(service_id)
            .arg("--now")
            .arg("--name")
            .arg(branch)
            .arg("--no-set-default")
            .arg("--output")
            .arg("json")
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(format!("branch tool not found: {}", cli.display()));
            }
            Err(e) => {
                return Err(format!("branch tool failed to spawn: {}", e));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr_lower = stderr.to_lowercase();
            if stderr_lower.contains("authentication required")
                || stderr_lower.contains("not logged in")
            {
                return Err(format!("branch tool not authenticated: {}", stderr.trim()));
            }
            return Err(format!(
                "branch tool exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        if !output.stdout.is_empty() {
            tracing::debug!(
                branch = %branch,
                response = %String::from_utf8_lossy(&output.stdout).trim(),
                "Branch tool response"
            );
        }

        Ok(())
    }
}
