//! atelier-engine - Architecture analysis service
//!
//! Turns a natural-language project brief into a persisted analysis:
//! one generated design, two expert critiques, a derived diagram, and
//! searchable findings. Per-blueprint data lives in branch-backed
//! stores when the branch CLI is available, with a one-way fallback to
//! the primary store when it is not.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use atelier_common::config::TomlConfig;
use atelier_engine::branch::BranchManager;
use atelier_engine::config::EngineConfig;
use atelier_engine::provider::GeminiProvider;
use atelier_engine::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting atelier-engine");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve configuration: env vars, then TOML file, then defaults
    let toml = TomlConfig::load()?;
    let config = EngineConfig::resolve(&toml)?;

    std::fs::create_dir_all(&config.data_dir)?;
    info!("Data directory: {}", config.data_dir.display());

    let db_pool = atelier_engine::db::init_primary_pool(&config.data_dir).await?;
    info!("Primary store ready");

    let branch_cli = probe_branch_cli(config.branch_cli.as_deref());
    let branches = BranchManager::new(
        config.data_dir.clone(),
        db_pool.clone(),
        branch_cli,
        config.branch_service_id.clone(),
    );

    let provider = GeminiProvider::new(config.gemini_api_key.clone(), config.gemini_model.clone())
        .map_err(|e| anyhow::anyhow!("Failed to build Gemini client: {}", e))?;

    let state = AppState::new(db_pool, branches, Arc::new(provider));
    let app = atelier_engine::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Verify the configured branch CLI responds to `--version`.
///
/// A missing or broken CLI is not fatal; the branch manager starts
/// degraded and every slot lands in the primary store.
fn probe_branch_cli(configured: Option<&str>) -> Option<PathBuf> {
    let cli = configured?;
    match Command::new(cli).arg("--version").output() {
        Ok(output) if output.status.success() => {
            info!("Branch CLI available: {}", cli);
            Some(PathBuf::from(cli))
        }
        Ok(output) => {
            warn!(
                "Branch CLI '{}' exited with {}; starting degraded",
                cli, output.status
            );
            None
        }
        Err(e) => {
            warn!("Branch CLI '{}' not usable ({}); starting degraded", cli, e);
            None
        }
    }
}
