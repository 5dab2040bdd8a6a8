//! Project lifecycle and search endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Analysis, Blueprint, Project, ProjectStatus};
use crate::pipeline::{self, EXPECTED_SLOTS};
use crate::search::search_project;
use crate::AppState;

/// Upper bound on page size for listings
const MAX_PAGE_SIZE: i64 = 100;

/// Request body for POST /projects
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    /// Natural-language project brief
    pub brief: String,
}

/// Response for POST /projects
#[derive(Debug, Serialize)]
pub struct CreateProjectResponse {
    pub project_id: Uuid,
    pub status: ProjectStatus,
    pub message: String,
}

/// Query parameters for GET /projects
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

/// One row of GET /projects
#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub brief: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

/// Response for GET /projects/{id}
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    pub id: Uuid,
    pub brief: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    /// Populated only once the project is completed
    pub blueprints: Vec<Blueprint>,
}

/// Response for GET /projects/{id}/status
#[derive(Debug, Serialize)]
pub struct ProjectStatusResponse {
    pub project_id: Uuid,
    pub status: ProjectStatus,
    pub brief: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for POST /projects/{id}/search
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// One search hit; the embedding vector is not exposed
#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub blueprint_id: Uuid,
    pub category: String,
    pub finding: String,
    pub severity: u8,
    pub persona: String,
}

impl From<Analysis> for SearchHit {
    fn from(analysis: Analysis) -> Self {
        Self {
            blueprint_id: analysis.blueprint_id,
            category: analysis.category,
            finding: analysis.finding,
            severity: analysis.severity,
            persona: analysis.persona.as_str().to_string(),
        }
    }
}

/// Response for POST /projects/{id}/search
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub project_id: Uuid,
    pub query: String,
    pub results: Vec<SearchHit>,
}

/// POST /projects
///
/// Creates the project as `pending`, runs the generate stage
/// synchronously so structural failures surface to the caller, then
/// flips to `processing` and backgrounds the rest of the slot pipeline.
pub async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<CreateProjectResponse>)> {
    let brief = req.brief.trim();
    if brief.is_empty() {
        return Err(ApiError::BadRequest("Project brief cannot be empty".into()));
    }

    let project = Project::new(brief.to_string());
    db::projects::create_project(&state.db, &project).await
        .map_err(ApiError::from)?;
    info!(project_id = %project.id, "Project created, generating blueprint");

    let draft = match pipeline::generate_blueprint(state.provider.as_ref(), brief).await {
        Ok(draft) => draft,
        Err(e) => {
            error!(project_id = %project.id, "Blueprint generation failed: {}", e);
            db::projects::transition_status(&state.db, project.id, ProjectStatus::Error)
                .await
                .map_err(ApiError::from)?;
            return Err(ApiError::Internal(format!(
                "Blueprint generation failed: {}",
                e
            )));
        }
    };

    db::projects::transition_status(&state.db, project.id, ProjectStatus::Processing)
        .await
        .map_err(ApiError::from)?;
    state.spawn_slot(project.id, 0, draft).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateProjectResponse {
            project_id: project.id,
            status: ProjectStatus::Processing,
            message: "Analysis started".to_string(),
        }),
    ))
}

/// GET /projects
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let status = match query.status.as_deref() {
        Some(raw) => Some(ProjectStatus::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown status filter: {}", raw))
        })?),
        None => None,
    };

    let projects = db::projects::list_projects(&state.db, skip, limit, status)
        .await
        .map_err(ApiError::from)?;
    let summaries = projects
        .into_iter()
        .map(|p| ProjectSummary {
            id: p.id,
            brief: p.brief_preview(200),
            status: p.status,
            created_at: p.created_at,
        })
        .collect();
    Ok(Json(summaries))
}

/// GET /projects/{id}
///
/// Blueprints stay empty until the project completes; once completed
/// they are read from the branch stores, falling back to the primary
/// store when no branch holds data.
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectDetail>> {
    let project = load_or_404(&state, project_id).await?;

    let blueprints = if project.status == ProjectStatus::Completed {
        collect_blueprints(&state, project_id).await?
    } else {
        Vec::new()
    };

    Ok(Json(ProjectDetail {
        id: project.id,
        brief: project.brief,
        status: project.status,
        created_at: project.created_at,
        blueprints,
    }))
}

/// GET /projects/{id}/status
pub async fn get_project_status(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectStatusResponse>> {
    let project = load_or_404(&state, project_id).await?;
    Ok(Json(ProjectStatusResponse {
        project_id: project.id,
        status: project.status,
        brief: project.brief_preview(100),
        created_at: project.created_at,
    }))
}

/// POST /projects/{id}/search
pub async fn search(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    let results = search_project(
        &state.db,
        &state.branches,
        state.provider.as_ref(),
        project_id,
        &req.query,
    )
    .await
    .map_err(ApiError::from)?;

    Ok(Json(SearchResponse {
        project_id,
        query: req.query.trim().to_string(),
        results: results.into_iter().map(SearchHit::from).collect(),
    }))
}

/// DELETE /projects/{id}
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    // Let any in-flight slot work settle before tearing down its stores.
    state.await_project(project_id).await;

    let deleted = db::projects::delete_project(&state.db, project_id)
        .await
        .map_err(ApiError::from)?;
    if !deleted {
        return Err(ApiError::NotFound(format!(
            "Project {} not found",
            project_id
        )));
    }

    for slot in 0..EXPECTED_SLOTS {
        state.branches.remove_branch_file(project_id, slot);
    }
    info!(%project_id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_or_404(state: &AppState, project_id: Uuid) -> ApiResult<Project> {
    db::projects::load_project(&state.db, project_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", project_id)))
}

async fn collect_blueprints(state: &AppState, project_id: Uuid) -> ApiResult<Vec<Blueprint>> {
    if state.branches.is_degraded() {
        return db::blueprints::load_blueprints_for_project(&state.db, project_id)
            .await
            .map_err(ApiError::from);
    }

    let mut blueprints = Vec::new();
    for slot in 0..EXPECTED_SLOTS {
        if let Some(handle) = state.branches.resolve_for_read(project_id, slot).await {
            blueprints.extend(
                db::blueprints::load_all_blueprints(&handle.pool)
                    .await
                    .map_err(ApiError::from)?,
            );
        }
    }
    if blueprints.is_empty() {
        // Completed before branching became available
        blueprints = db::blueprints::load_blueprints_for_project(&state.db, project_id)
            .await
            .map_err(ApiError::from)?;
    }
    Ok(blueprints)
}

/// Build project routes
pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create_project).get(list_projects))
        .route("/projects/:id", get(get_project).delete(delete_project))
        .route("/projects/:id/status", get(get_project_status))
        .route("/projects/:id/search", post(search))
}
