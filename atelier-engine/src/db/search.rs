//! Per-store hybrid search
//!
//! A hybrid query combines a case-insensitive text match on the finding
//! with nearest-neighbor ordering on the embedding distance. SQLite has
//! no native vector operator, so the text predicate runs in SQL and the
//! distance ordering runs in-process over the matched rows. Each store
//! limits and orders its own results; no cross-store ranking happens here.

use atelier_common::Result;
use sqlx::SqlitePool;

use crate::models::Analysis;

/// Per-store result limit
pub const SEARCH_LIMIT: usize = 15;

/// Run a hybrid keyword + vector query against one store
pub async fn hybrid_search(
    pool: &SqlitePool,
    query_text: &str,
    query_embedding: &[f32],
) -> Result<Vec<Analysis>> {
    if query_text.is_empty() || query_embedding.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", query_text);
    let rows = sqlx::query(
        r#"
        SELECT id, blueprint_id, category, finding, severity, persona, embedding
        FROM analyses
        WHERE finding LIKE ? COLLATE NOCASE
        "#,
    )
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    let mut matches: Vec<Analysis> = rows
        .into_iter()
        .map(super::blueprints::analysis_from_row)
        .collect::<Result<_>>()?;

    // Nearest first; findings without an embedding sort last
    matches.sort_by(|a, b| {
        let da = distance_or_max(a.embedding.as_deref(), query_embedding);
        let db = distance_or_max(b.embedding.as_deref(), query_embedding);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(SEARCH_LIMIT);

    Ok(matches)
}

fn distance_or_max(embedding: Option<&[f32]>, query: &[f32]) -> f32 {
    embedding
        .map(|e| cosine_distance(e, query))
        .unwrap_or(f32::MAX)
}

/// Cosine distance in [0, 2]; mismatched or zero vectors map to the
/// maximum distance so they never outrank real neighbors
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 2.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 2.0;
    }

    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}
