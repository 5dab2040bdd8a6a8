//! Project database operations

use atelier_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Project, ProjectStatus};

/// Insert a new project record
pub async fn create_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO projects (id, brief, status, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(project.id.to_string())
    .bind(&project.brief)
    .bind(project.status.as_str())
    .bind(project.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a project by id
pub async fn load_project(pool: &SqlitePool, project_id: Uuid) -> Result<Option<Project>> {
    let row = sqlx::query(
        "SELECT id, brief, status, created_at FROM projects WHERE id = ?",
    )
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(project_from_row).transpose()
}

/// List projects, newest first, with optional status filter
pub async fn list_projects(
    pool: &SqlitePool,
    skip: i64,
    limit: i64,
    status: Option<ProjectStatus>,
) -> Result<Vec<Project>> {
    let rows = match status {
        Some(status) => {
            sqlx::query(
                r#"
                SELECT id, brief, status, created_at FROM projects
                WHERE status = ?
                ORDER BY created_at DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(status.as_str())
            .bind(limit)
            .bind(skip)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, brief, status, created_at FROM projects
                ORDER BY created_at DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(limit)
            .bind(skip)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(project_from_row).collect()
}

/// Update a project's status
pub async fn update_status(
    pool: &SqlitePool,
    project_id: Uuid,
    status: ProjectStatus,
) -> Result<()> {
    sqlx::query("UPDATE projects SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(project_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Guarded status write: the transition goes through the model helper,
/// so a terminal project is never overwritten. Returns false when the
/// project is missing or its status is frozen.
pub async fn transition_status(
    pool: &SqlitePool,
    project_id: Uuid,
    new_status: ProjectStatus,
) -> Result<bool> {
    let Some(mut project) = load_project(pool, project_id).await? else {
        return Ok(false);
    };
    let Some(transition) = project.transition_to(new_status) else {
        tracing::debug!(
            %project_id,
            status = project.status.as_str(),
            "Status is terminal, transition refused"
        );
        return Ok(false);
    };

    update_status(pool, project_id, transition.new_status).await?;
    tracing::debug!(
        %project_id,
        from = transition.old_status.as_str(),
        to = transition.new_status.as_str(),
        "Project status transitioned"
    );
    Ok(true)
}

/// Delete a project and its owned blueprints/analyses from the primary
/// store. Returns false when the project did not exist.
pub async fn delete_project(pool: &SqlitePool, project_id: Uuid) -> Result<bool> {
    let project_id = project_id.to_string();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM analyses WHERE blueprint_id IN
            (SELECT id FROM blueprints WHERE project_id = ?)
        "#,
    )
    .bind(&project_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM blueprints WHERE project_id = ?")
        .bind(&project_id)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(&project_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(deleted.rows_affected() > 0)
}

fn project_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Project> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid project id in store: {}", e)))?;

    let status: String = row.get("status");
    let status = ProjectStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown project status in store: {}", status)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Invalid created_at in store: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(Project {
        id,
        brief: row.get("brief"),
        status,
        created_at,
    })
}
