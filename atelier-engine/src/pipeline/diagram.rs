//! Diagram synthesis stage
//!
//! Derives a Mermaid component diagram from the generated design and the
//! critique findings. This stage is fail-soft: any provider failure or
//! unusable output degrades to no diagram rather than failing the slot.

use tracing::warn;

use crate::pipeline::architect::BlueprintDraft;
use crate::pipeline::critique::Finding;
use crate::provider::{strip_code_fences, GenerationProvider};

const DIAGRAM_PROMPT: &str = r#"You are a software architect producing a component diagram.

Given the design below and the analyst findings, produce a Mermaid
diagram of the major components and their interactions. Respond with
ONLY the Mermaid source, starting with "graph TB". Do not include any
prose before or after the diagram.
"#;

/// Render a Mermaid diagram for the blueprint, or `None` when the
/// provider fails or returns nothing usable.
pub async fn render_diagram(
    provider: &dyn GenerationProvider,
    draft: &BlueprintDraft,
    findings: &[Finding],
) -> Option<String> {
    let prompt = build_prompt(draft, findings);
    match provider.generate_text(&prompt).await {
        Ok(raw) => normalize_diagram(&raw),
        Err(e) => {
            warn!("Diagram synthesis failed, continuing without diagram: {}", e);
            None
        }
    }
}

fn build_prompt(draft: &BlueprintDraft, findings: &[Finding]) -> String {
    let mut prompt = String::from(DIAGRAM_PROMPT);
    prompt.push_str("\nDesign name: ");
    prompt.push_str(&draft.name);
    prompt.push_str("\nDesign description: ");
    prompt.push_str(&draft.description);
    if !findings.is_empty() {
        prompt.push_str("\n\nAnalyst findings to reflect where relevant:\n");
        for finding in findings {
            prompt.push_str(&format!(
                "- [{}] {}: {}\n",
                finding.category,
                finding.persona.as_str(),
                finding.finding
            ));
        }
    }
    prompt
}

/// Strip code fences and make sure the source opens with a Mermaid
/// graph header. Output that is empty after cleanup is discarded.
fn normalize_diagram(raw: &str) -> Option<String> {
    let cleaned = strip_code_fences(raw).trim();
    if cleaned.is_empty() {
        warn!("Diagram synthesis returned empty output, continuing without diagram");
        return None;
    }
    if cleaned.starts_with("graph TB") || cleaned.starts_with("graph TD") {
        Some(cleaned.to_string())
    } else {
        Some(format!("graph TB\n{}", cleaned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_output_is_stripped() {
        let raw = "```mermaid\ngraph TB\n  A --> B\n```";
        let diagram = normalize_diagram(raw).unwrap();
        assert_eq!(diagram, "graph TB\n  A --> B");
    }

    #[test]
    fn missing_header_is_prepended() {
        let diagram = normalize_diagram("  A --> B").unwrap();
        assert_eq!(diagram, "graph TB\nA --> B");
    }

    #[test]
    fn graph_td_header_is_kept() {
        let diagram = normalize_diagram("graph TD\n  A --> B").unwrap();
        assert!(diagram.starts_with("graph TD"));
    }

    #[test]
    fn empty_output_yields_none() {
        assert!(normalize_diagram("```\n```").is_none());
        assert!(normalize_diagram("   ").is_none());
    }

    #[test]
    fn prompt_includes_findings() {
        let draft = BlueprintDraft {
            name: "Event bus".into(),
            description: "A pub/sub core".into(),
            pros: vec![],
            cons: vec![],
        };
        let findings = vec![Finding {
            category: "Scalability".into(),
            finding: "Single broker is a bottleneck".into(),
            severity: 7,
            persona: crate::models::Persona::Systems,
        }];
        let prompt = build_prompt(&draft, &findings);
        assert!(prompt.contains("Mermaid"));
        assert!(prompt.contains("Single broker is a bottleneck"));
    }
}
