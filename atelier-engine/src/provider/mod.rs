//! Generation collaborator interface
//!
//! The pipeline consumes text generation and embeddings through the
//! [`GenerationProvider`] trait; the concrete Gemini client lives in
//! [`gemini`], and tests substitute scripted implementations.

pub mod gemini;

pub use gemini::GeminiProvider;

use async_trait::async_trait;
use thiserror::Error;

/// Generation provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Empty response from provider")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Text generation and embedding collaborator
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate structured text for a prompt
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Embed a string; `None` when no vector is available for the input
    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, ProviderError>;
}

/// Strip markdown code fences the provider sometimes wraps around
/// structured output
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    for prefix in ["```json", "```mermaid", "```"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest;
            break;
        }
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fences("```json\n[{\"a\":1}]\n```"), "[{\"a\":1}]");
    }

    #[test]
    fn strips_bare_and_mermaid_fences() {
        assert_eq!(strip_code_fences("```\ngraph TB\n```"), "graph TB");
        assert_eq!(strip_code_fences("```mermaid\ngraph TB\nA-->B\n```"), "graph TB\nA-->B");
    }

    #[test]
    fn unfenced_text_passes_through() {
        assert_eq!(strip_code_fences("  graph TB\nA-->B  "), "graph TB\nA-->B");
    }
}
