//! Critique stage
//!
//! Two independent critique personas run concurrently against the
//! generated design. The stage is fail-fast: if either persona fails
//! (provider error, malformed output, out-of-range severity), the whole
//! stage fails and nothing from the other persona is accepted.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{severity_in_range, Persona};
use crate::provider::{strip_code_fences, GenerationProvider};

use super::{architect::BlueprintDraft, PipelineError, ValidationError};

const SYSTEMS_PROMPT: &str = "\
You are a senior systems analyst assessing architecture for technical risk.

Identify issues in the design below from a SYSTEMS perspective: performance \
bottlenecks, scalability limits, security vulnerabilities, reliability issues, \
technical debt.

Respond with ONLY a valid JSON array of 2-4 objects, each with these keys:
- \"category\": string (max 100 chars), e.g. \"Performance\", \"Security\"
- \"finding\": string with the detailed technical concern
- \"severity\": integer 1-10 where 1=low and 10=critical

No extra text, no markdown fences.

Analyze this architecture:";

const OPERATIONS_PROMPT: &str = "\
You are a senior operations analyst assessing architecture for operational and \
business risk.

Identify issues in the design below from an OPERATIONS perspective: operational \
complexity, cost implications, team skill requirements, deployment challenges, \
monitoring needs, compliance.

Respond with ONLY a valid JSON array of 2-4 objects, each with these keys:
- \"category\": string (max 100 chars), e.g. \"Cost\", \"Deployment\"
- \"finding\": string with the detailed operational concern
- \"severity\": integer 1-10 where 1=low and 10=critical

No extra text, no markdown fences.

Analyze this architecture:";

/// One validated critique finding, tagged with its persona
#[derive(Debug, Clone)]
pub struct Finding {
    pub category: String,
    pub finding: String,
    pub severity: u8,
    pub persona: Persona,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    category: String,
    finding: String,
    severity: i64,
}

/// Run both critique personas concurrently against a design
pub async fn critique_blueprint(
    provider: &dyn GenerationProvider,
    draft: &BlueprintDraft,
) -> Result<Vec<Finding>, PipelineError> {
    let context = design_context(draft);

    let (systems, operations) = tokio::join!(
        run_persona(provider, Persona::Systems, SYSTEMS_PROMPT, &context),
        run_persona(provider, Persona::Operations, OPERATIONS_PROMPT, &context),
    );

    // Fail-fast: both personas must succeed before either is accepted
    let mut findings = systems?;
    findings.extend(operations?);

    tracing::info!(
        design = %draft.name,
        finding_count = findings.len(),
        "Critique stage completed"
    );

    Ok(findings)
}

async fn run_persona(
    provider: &dyn GenerationProvider,
    persona: Persona,
    prompt: &str,
    context: &str,
) -> Result<Vec<Finding>, PipelineError> {
    let full_prompt = format!("{}\n{}", prompt, context);
    let response = provider.generate_text(&full_prompt).await?;
    let findings = parse_findings(&response, persona)?;

    tracing::debug!(
        persona = persona.as_str(),
        finding_count = findings.len(),
        "Persona critique parsed"
    );

    Ok(findings)
}

/// Parse and validate one persona's critique output
pub fn parse_findings(raw: &str, persona: Persona) -> Result<Vec<Finding>, ValidationError> {
    let context = format!("{} critique output", persona.as_str());
    let cleaned = strip_code_fences(raw);

    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| ValidationError::new(format!("{} is not valid JSON", context), vec![e.to_string()]))?;

    let array = value
        .as_array()
        .ok_or_else(|| ValidationError::new(&context, vec!["expected a JSON array".to_string()]))?;

    let mut findings = Vec::with_capacity(array.len());
    let mut issues = Vec::new();

    for (index, item) in array.iter().enumerate() {
        let before = issues.len();
        for key in ["category", "finding", "severity"] {
            if item.get(key).is_none() {
                issues.push(format!("item {} missing required field '{}'", index, key));
            }
        }
        if issues.len() > before {
            continue;
        }

        let raw: RawFinding = match serde_json::from_value(item.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                issues.push(format!("item {} has invalid field types: {}", index, e));
                continue;
            }
        };

        if !severity_in_range(raw.severity) {
            issues.push(format!(
                "item {} severity {} out of range [1, 10]",
                index, raw.severity
            ));
            continue;
        }
        if raw.category.chars().count() > 100 {
            issues.push(format!("item {} category exceeds 100 characters", index));
            continue;
        }

        findings.push(Finding {
            category: raw.category,
            finding: raw.finding,
            severity: raw.severity as u8,
            persona,
        });
    }

    if !issues.is_empty() {
        return Err(ValidationError::new(context, issues));
    }

    Ok(findings)
}

fn design_context(draft: &BlueprintDraft) -> String {
    format!(
        "\nArchitecture name: {}\nDescription: {}\n\nPros: {}\nCons: {}\n",
        draft.name,
        draft.description,
        serde_json::to_string(&draft.pros).unwrap_or_else(|_| "[]".to_string()),
        serde_json::to_string(&draft.cons).unwrap_or_else(|_| "[]".to_string()),
    )
}
