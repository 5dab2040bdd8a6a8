//! Analysis pipeline
//!
//! Per blueprint slot the stages run strictly in order:
//! Generate → Critique → Enrich → Diagram → Persist → Detect.
//! Generate runs synchronously during project creation; the rest run as
//! one background unit of work per slot. Critique is fail-fast (both
//! personas or nothing), enrichment and diagram synthesis are fail-soft.

pub mod architect;
pub mod completion;
pub mod critique;
pub mod diagram;
pub mod orchestrator;

pub use architect::{generate_blueprint, BlueprintDraft};
pub use completion::{check_and_advance, EXPECTED_SLOTS};
pub use critique::{critique_blueprint, Finding};
pub use orchestrator::run_slot;

use thiserror::Error;

use crate::provider::ProviderError;

/// Structural validation failure for generated content, enumerating
/// the missing or invalid fields
#[derive(Debug, Error)]
#[error("{}: {}", .context, .issues.join("; "))]
pub struct ValidationError {
    pub context: String,
    pub issues: Vec<String>,
}

impl ValidationError {
    pub fn new(context: impl Into<String>, issues: Vec<String>) -> Self {
        Self {
            context: context.into(),
            issues,
        }
    }
}

/// Pipeline stage errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Generation collaborator failure
    #[error("Provider failure: {0}")]
    Provider(#[from] ProviderError),

    /// Generated content failed structural validation
    #[error("Invalid generated content: {0}")]
    Validation(#[from] ValidationError),

    /// Storage failure while persisting the slot
    #[error("Storage failure: {0}")]
    Store(#[from] atelier_common::Error),
}
