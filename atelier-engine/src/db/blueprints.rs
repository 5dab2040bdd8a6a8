//! Blueprint and analysis persistence
//!
//! A blueprint and all its analyses are written in one transaction:
//! either the full subtree lands or nothing does.

use atelier_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{severity_in_range, Analysis, Blueprint, Persona, TradeOff};

/// Save a blueprint together with all its analyses atomically
pub async fn save_blueprint_with_analyses(pool: &SqlitePool, blueprint: &Blueprint) -> Result<()> {
    // Re-validate severity at the persistence boundary; the critique
    // stage already checked it, but a blueprint must never land with
    // out-of-range findings.
    for analysis in &blueprint.analyses {
        if !severity_in_range(analysis.severity as i64) {
            return Err(Error::Validation(format!(
                "severity {} out of range [1, 10] for category '{}'",
                analysis.severity, analysis.category
            )));
        }
    }

    let pros = serde_json::to_string(&blueprint.pros)
        .map_err(|e| Error::Internal(format!("Failed to serialize pros: {}", e)))?;
    let cons = serde_json::to_string(&blueprint.cons)
        .map_err(|e| Error::Internal(format!("Failed to serialize cons: {}", e)))?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO blueprints (id, project_id, name, description, pros, cons, diagram)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(blueprint.id.to_string())
    .bind(blueprint.project_id.to_string())
    .bind(&blueprint.name)
    .bind(&blueprint.description)
    .bind(&pros)
    .bind(&cons)
    .bind(&blueprint.diagram)
    .execute(&mut *tx)
    .await?;

    for analysis in &blueprint.analyses {
        let embedding = analysis
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Internal(format!("Failed to serialize embedding: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO analyses (id, blueprint_id, category, finding, severity, persona, embedding)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(analysis.id.to_string())
        .bind(analysis.blueprint_id.to_string())
        .bind(&analysis.category)
        .bind(&analysis.finding)
        .bind(analysis.severity as i64)
        .bind(analysis.persona.as_str())
        .bind(embedding)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

/// Load all blueprints (with analyses) owned by a project
pub async fn load_blueprints_for_project(
    pool: &SqlitePool,
    project_id: Uuid,
) -> Result<Vec<Blueprint>> {
    let rows = sqlx::query(
        r#"
        SELECT id, project_id, name, description, pros, cons, diagram
        FROM blueprints WHERE project_id = ?
        "#,
    )
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut blueprints = Vec::with_capacity(rows.len());
    for row in rows {
        let mut blueprint = blueprint_from_row(row)?;
        blueprint.analyses = load_analyses_for_blueprint(pool, blueprint.id).await?;
        blueprints.push(blueprint);
    }

    Ok(blueprints)
}

/// Load every blueprint in a store
///
/// Used against branch databases, which hold exactly one slot's subtree.
pub async fn load_all_blueprints(pool: &SqlitePool) -> Result<Vec<Blueprint>> {
    let rows = sqlx::query(
        "SELECT id, project_id, name, description, pros, cons, diagram FROM blueprints",
    )
    .fetch_all(pool)
    .await?;

    let mut blueprints = Vec::with_capacity(rows.len());
    for row in rows {
        let mut blueprint = blueprint_from_row(row)?;
        blueprint.analyses = load_analyses_for_blueprint(pool, blueprint.id).await?;
        blueprints.push(blueprint);
    }

    Ok(blueprints)
}

/// Whether a store holds at least one blueprint (completion probe)
pub async fn has_blueprint(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blueprints")
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Completion check for the primary-store fallback: the project owns at
/// least one blueprint and every owned blueprint has at least one analysis.
pub async fn project_subtree_complete(pool: &SqlitePool, project_id: Uuid) -> Result<bool> {
    let project_id = project_id.to_string();

    let blueprint_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM blueprints WHERE project_id = ?")
            .bind(&project_id)
            .fetch_one(pool)
            .await?;
    if blueprint_count == 0 {
        return Ok(false);
    }

    let unanalyzed: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM blueprints b
        WHERE b.project_id = ?
          AND NOT EXISTS (SELECT 1 FROM analyses a WHERE a.blueprint_id = b.id)
        "#,
    )
    .bind(&project_id)
    .fetch_one(pool)
    .await?;

    Ok(unanalyzed == 0)
}

fn blueprint_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Blueprint> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid blueprint id in store: {}", e)))?;

    let project_id: String = row.get("project_id");
    let project_id = Uuid::parse_str(&project_id)
        .map_err(|e| Error::Internal(format!("Invalid project id in store: {}", e)))?;

    let pros: String = row.get("pros");
    let pros: Vec<TradeOff> = serde_json::from_str(&pros)
        .map_err(|e| Error::Internal(format!("Failed to deserialize pros: {}", e)))?;

    let cons: String = row.get("cons");
    let cons: Vec<TradeOff> = serde_json::from_str(&cons)
        .map_err(|e| Error::Internal(format!("Failed to deserialize cons: {}", e)))?;

    Ok(Blueprint {
        id,
        project_id,
        name: row.get("name"),
        description: row.get("description"),
        pros,
        cons,
        diagram: row.get("diagram"),
        analyses: Vec::new(),
    })
}

async fn load_analyses_for_blueprint(pool: &SqlitePool, blueprint_id: Uuid) -> Result<Vec<Analysis>> {
    let rows = sqlx::query(
        r#"
        SELECT id, blueprint_id, category, finding, severity, persona, embedding
        FROM analyses WHERE blueprint_id = ?
        "#,
    )
    .bind(blueprint_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(analysis_from_row).collect()
}

pub(crate) fn analysis_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Analysis> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid analysis id in store: {}", e)))?;

    let blueprint_id: String = row.get("blueprint_id");
    let blueprint_id = Uuid::parse_str(&blueprint_id)
        .map_err(|e| Error::Internal(format!("Invalid blueprint id in store: {}", e)))?;

    let persona: String = row.get("persona");
    let persona = Persona::parse(&persona)
        .ok_or_else(|| Error::Internal(format!("Unknown persona in store: {}", persona)))?;

    let embedding: Option<String> = row.get("embedding");
    let embedding: Option<Vec<f32>> = embedding
        .map(|e| serde_json::from_str(&e))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize embedding: {}", e)))?;

    Ok(Analysis {
        id,
        blueprint_id,
        category: row.get("category"),
        finding: row.get("finding"),
        severity: row.get::<i64, _>("severity") as u8,
        persona,
        embedding,
    })
}
