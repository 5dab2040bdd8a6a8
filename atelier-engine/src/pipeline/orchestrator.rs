//! Per-slot pipeline orchestration
//!
//! Runs the background stages for one blueprint slot: critique the
//! generated design, enrich findings with embeddings, synthesize a
//! diagram, persist the slot atomically into its resolved store, then
//! re-check project completion.

use std::sync::Arc;

use futures::future::join_all;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::branch::BranchManager;
use crate::db;
use crate::models::{Analysis, Blueprint, ProjectStatus};
use crate::pipeline::architect::BlueprintDraft;
use crate::pipeline::critique::{critique_blueprint, Finding};
use crate::pipeline::diagram::render_diagram;
use crate::pipeline::{check_and_advance, PipelineError};
use crate::provider::GenerationProvider;

/// Run the background stages for one blueprint slot.
///
/// Failures never propagate out of the task: the project is moved to the
/// error state and the cause is logged.
pub async fn run_slot(
    pool: SqlitePool,
    branches: BranchManager,
    provider: Arc<dyn GenerationProvider>,
    project_id: Uuid,
    slot: u32,
    draft: BlueprintDraft,
) {
    if let Err(e) = run_slot_inner(&pool, &branches, provider.as_ref(), project_id, slot, &draft).await
    {
        error!(%project_id, slot, "Slot pipeline failed: {}", e);
        if let Err(e) =
            db::projects::transition_status(&pool, project_id, ProjectStatus::Error).await
        {
            error!(%project_id, "Failed to record error state: {}", e);
        }
        return;
    }

    // Detection is idempotent, so a failure here only delays the status
    // advance rather than invalidating the persisted slot.
    if let Err(e) = check_and_advance(&pool, &branches, project_id).await {
        warn!(%project_id, "Completion check failed after slot persist: {}", e);
    }
}

async fn run_slot_inner(
    pool: &SqlitePool,
    branches: &BranchManager,
    provider: &dyn GenerationProvider,
    project_id: Uuid,
    slot: u32,
    draft: &BlueprintDraft,
) -> Result<(), PipelineError> {
    let findings = critique_blueprint(provider, draft).await?;
    info!(%project_id, slot, count = findings.len(), "Critique produced findings");

    let embeddings = enrich_findings(provider, &findings).await;
    let diagram = render_diagram(provider, draft, &findings).await;

    let handle = branches.create_branch(project_id, slot).await;
    info!(%project_id, slot, branch = %handle.branch, "Persisting slot");

    let mut blueprint = Blueprint::new(
        project_id,
        draft.name.clone(),
        draft.description.clone(),
        draft.pros.clone(),
        draft.cons.clone(),
    );
    blueprint.diagram = diagram;
    for (finding, embedding) in findings.into_iter().zip(embeddings) {
        let mut analysis = Analysis::new(
            blueprint.id,
            finding.category,
            finding.finding,
            finding.severity,
            finding.persona,
        );
        analysis.embedding = embedding;
        blueprint.analyses.push(analysis);
    }

    db::blueprints::save_blueprint_with_analyses(&handle.pool, &blueprint).await?;
    Ok(())
}

/// Embed each finding's text. Fail-soft per finding: a provider error or
/// an absent vector leaves that finding without an embedding.
async fn enrich_findings(
    provider: &dyn GenerationProvider,
    findings: &[Finding],
) -> Vec<Option<Vec<f32>>> {
    let futures = findings.iter().map(|f| provider.embed(&f.finding));
    join_all(futures)
        .await
        .into_iter()
        .zip(findings)
        .map(|(result, finding)| match result {
            Ok(Some(vector)) => Some(vector),
            Ok(None) => {
                warn!(category = %finding.category, "Embedding unavailable for finding");
                None
            }
            Err(e) => {
                warn!(category = %finding.category, "Embedding failed for finding: {}", e);
                None
            }
        })
        .collect()
}
