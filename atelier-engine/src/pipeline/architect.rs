//! Generate stage
//!
//! Asks the generation collaborator for one architectural design and
//! validates the structured output before anything downstream runs.
//! This stage is synchronous with project creation: its failure is
//! surfaced directly to the caller.

use serde::Deserialize;
use serde_json::Value;

use crate::models::TradeOff;
use crate::provider::{strip_code_fences, GenerationProvider};

use super::{PipelineError, ValidationError};

const ARCHITECT_PROMPT: &str = "\
You are a senior software architect designing scalable, cloud-native systems.

Analyze the project requirements below and design one architecture for them.

Respond with ONLY a valid JSON array containing exactly 1 object with these keys:
- \"name\": string (max 255 chars) naming the architecture
- \"description\": string describing the core services, communication \
patterns, data management strategy and infrastructure
- \"pros\": array of 4-6 objects, each {\"point\": string, \"rationale\": string}
- \"cons\": array of 4-6 objects, each {\"point\": string, \"rationale\": string}

No extra text, no explanations, no markdown fences.

Design an architecture for this project:";

/// Validated output of the generate stage
#[derive(Debug, Clone, Deserialize)]
pub struct BlueprintDraft {
    pub name: String,
    pub description: String,
    pub pros: Vec<TradeOff>,
    pub cons: Vec<TradeOff>,
}

/// Run the generate stage for a brief
pub async fn generate_blueprint(
    provider: &dyn GenerationProvider,
    brief: &str,
) -> Result<BlueprintDraft, PipelineError> {
    let prompt = format!("{}\n\nProject requirements:\n{}", ARCHITECT_PROMPT, brief);
    let response = provider.generate_text(&prompt).await?;
    let draft = parse_blueprint_draft(&response)?;

    tracing::info!(name = %draft.name, "Generated architectural design");

    Ok(draft)
}

/// Parse and validate the raw generation output
///
/// Validation is typed and exhaustive: the result either carries a
/// fully-shaped draft or enumerates every missing/invalid field.
pub fn parse_blueprint_draft(raw: &str) -> Result<BlueprintDraft, ValidationError> {
    let cleaned = strip_code_fences(raw);

    let value: Value = serde_json::from_str(cleaned).map_err(|e| {
        ValidationError::new("design output is not valid JSON", vec![e.to_string()])
    })?;

    let array = value.as_array().ok_or_else(|| {
        ValidationError::new("design output", vec!["expected a JSON array".to_string()])
    })?;
    if array.len() != 1 {
        return Err(ValidationError::new(
            "design output",
            vec![format!("expected exactly 1 design, got {}", array.len())],
        ));
    }

    let object = &array[0];
    let mut issues = Vec::new();
    for key in ["name", "description", "pros", "cons"] {
        if object.get(key).is_none() {
            issues.push(format!("missing required field '{}'", key));
        }
    }
    if !issues.is_empty() {
        return Err(ValidationError::new("design output", issues));
    }

    let draft: BlueprintDraft = serde_json::from_value(object.clone()).map_err(|e| {
        ValidationError::new("design output has invalid field types", vec![e.to_string()])
    })?;

    let mut issues = Vec::new();
    if draft.name.trim().is_empty() {
        issues.push("'name' is empty".to_string());
    }
    if draft.name.chars().count() > 255 {
        issues.push("'name' exceeds 255 characters".to_string());
    }
    if draft.description.trim().is_empty() {
        issues.push("'description' is empty".to_string());
    }
    if !issues.is_empty() {
        return Err(ValidationError::new("design output", issues));
    }

    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"[{
        "name": "Event-Driven Microservices",
        "description": "independent services over an event bus",
        "pros": [{"point": "Fault isolation", "rationale": "failures stay local"}],
        "cons": [{"point": "Operational complexity", "rationale": "many moving parts"}]
    }]"#;

    #[test]
    fn valid_draft_parses() {
        let draft = parse_blueprint_draft(VALID).unwrap();
        assert_eq!(draft.name, "Event-Driven Microservices");
        assert_eq!(draft.pros.len(), 1);
        assert_eq!(draft.cons[0].point, "Operational complexity");
    }

    #[test]
    fn fenced_output_parses() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(parse_blueprint_draft(&fenced).is_ok());
    }

    #[test]
    fn missing_fields_are_enumerated() {
        let err = parse_blueprint_draft(r#"[{"name": "X"}]"#).unwrap_err();
        assert_eq!(err.issues.len(), 3);
        assert!(err.issues.iter().any(|i| i.contains("'description'")));
        assert!(err.issues.iter().any(|i| i.contains("'pros'")));
        assert!(err.issues.iter().any(|i| i.contains("'cons'")));
    }

    #[test]
    fn wrong_cardinality_rejected() {
        let err = parse_blueprint_draft("[]").unwrap_err();
        assert!(err.issues[0].contains("expected exactly 1"));

        let err = parse_blueprint_draft(r#"{"name": "X"}"#).unwrap_err();
        assert!(err.issues[0].contains("expected a JSON array"));
    }

    #[test]
    fn empty_name_rejected() {
        let input = VALID.replace("Event-Driven Microservices", "  ");
        let err = parse_blueprint_draft(&input).unwrap_err();
        assert!(err.issues.iter().any(|i| i.contains("'name' is empty")));
    }

    #[test]
    fn non_json_rejected() {
        let err = parse_blueprint_draft("here is your design!").unwrap_err();
        assert!(err.context.contains("not valid JSON"));
    }
}
