//! Shared test helpers: scripted provider and app construction

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use atelier_engine::branch::BranchManager;
use atelier_engine::provider::{GenerationProvider, ProviderError};
use atelier_engine::AppState;

/// Scripted provider for deterministic pipeline runs.
///
/// Prompts are discriminated by stable markers: the diagram prompt
/// mentions Mermaid, each critique prompt names its analyst persona,
/// and everything else is the architect prompt. A `None` script makes
/// that call fail.
pub struct MockProvider {
    pub architect: Option<String>,
    pub systems: Option<String>,
    pub operations: Option<String>,
    pub diagram: Option<String>,
    /// The first N embed calls fail, the rest succeed
    pub embed_failures: AtomicUsize,
    /// Total embed calls observed
    pub embed_calls: AtomicUsize,
}

impl MockProvider {
    pub fn happy() -> Self {
        Self {
            architect: Some(architect_json()),
            systems: Some(systems_json()),
            operations: Some(operations_json()),
            diagram: Some("graph TB\n  API --> Broker\n  Broker --> Store".to_string()),
            embed_failures: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let scripted = if prompt.contains("Mermaid") {
            &self.diagram
        } else if prompt.contains("operations analyst") {
            &self.operations
        } else if prompt.contains("systems analyst") {
            &self.systems
        } else {
            &self.architect
        };
        scripted
            .clone()
            .ok_or_else(|| ProviderError::Api(500, "scripted failure".to_string()))
    }

    async fn embed(&self, _text: &str) -> Result<Option<Vec<f32>>, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.embed_failures.load(Ordering::SeqCst) > 0 {
            self.embed_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(ProviderError::Api(500, "scripted embed failure".to_string()));
        }
        Ok(Some(vec![1.0, 0.0, 0.0]))
    }
}

pub fn architect_json() -> String {
    serde_json::json!([{
        "name": "Event-driven ingestion platform",
        "description": "A broker-centric pipeline with stateless workers",
        "pros": [
            {"point": "Independent scaling", "rationale": "Workers scale without touching the broker"}
        ],
        "cons": [
            {"point": "Operational surface", "rationale": "The broker is one more stateful system to run"}
        ]
    }])
    .to_string()
}

pub fn systems_json() -> String {
    serde_json::json!([
        {"category": "Security", "finding": "Token leakage between worker restarts", "severity": 9},
        {"category": "Performance", "finding": "Broker fan-out saturates under burst load", "severity": 6}
    ])
    .to_string()
}

pub fn operations_json() -> String {
    serde_json::json!([
        {"category": "Cost", "finding": "Idle workers still bill for reserved capacity", "severity": 4}
    ])
    .to_string()
}

pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    atelier_engine::db::init_schema(&pool).await.expect("schema");
    pool
}

/// App state with an unconfigured branch backend (degraded from startup).
pub async fn degraded_state(provider: Arc<MockProvider>) -> AppState {
    let pool = memory_pool().await;
    let branches = BranchManager::new(
        std::env::temp_dir().join("atelier-test-unused"),
        pool.clone(),
        None,
        None,
    );
    AppState::new(pool, branches, provider)
}
