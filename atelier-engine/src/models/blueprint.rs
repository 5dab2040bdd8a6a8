//! Blueprint and analysis records
//!
//! A blueprint is one generated architectural design plus its critique
//! findings and optional diagram. Blueprints are written once, atomically
//! with all their analyses, and never updated in place.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity bounds for critique findings
pub const SEVERITY_MIN: u8 = 1;
pub const SEVERITY_MAX: u8 = 10;

/// One advantage or disadvantage of a design
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOff {
    /// Short label, e.g. "Independent Scalability"
    pub point: String,
    /// Why the point holds for this design
    pub rationale: String,
}

/// Critique persona that produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Systems-risk viewpoint: performance, scalability, reliability
    Systems,
    /// Operations-risk viewpoint: cost, team, deployment
    Operations,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Systems => "systems",
            Persona::Operations => "operations",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "systems" => Some(Persona::Systems),
            "operations" => Some(Persona::Operations),
            _ => None,
        }
    }
}

/// One generated architectural design
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    /// Unique blueprint identifier
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Design name
    pub name: String,

    /// Technical description of the design
    pub description: String,

    /// Advantages, in generation order
    pub pros: Vec<TradeOff>,

    /// Disadvantages, in generation order
    pub cons: Vec<TradeOff>,

    /// Derived diagram syntax; absent when diagram synthesis failed
    pub diagram: Option<String>,

    /// Critique findings persisted alongside this blueprint
    pub analyses: Vec<Analysis>,
}

impl Blueprint {
    pub fn new(
        project_id: Uuid,
        name: String,
        description: String,
        pros: Vec<TradeOff>,
        cons: Vec<TradeOff>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name,
            description,
            pros,
            cons,
            diagram: None,
            analyses: Vec::new(),
        }
    }
}

/// One critique finding for a blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Unique analysis identifier
    pub id: Uuid,

    /// Owning blueprint
    pub blueprint_id: Uuid,

    /// Finding category, e.g. "Performance" or "Cost"
    pub category: String,

    /// Free-text finding
    pub finding: String,

    /// Risk level in [1, 10]
    pub severity: u8,

    /// Which critique persona produced the finding
    pub persona: Persona,

    /// Embedding vector for the finding text; absent when the
    /// enrichment call failed (fail-soft)
    pub embedding: Option<Vec<f32>>,
}

impl Analysis {
    pub fn new(
        blueprint_id: Uuid,
        category: String,
        finding: String,
        severity: u8,
        persona: Persona,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            blueprint_id,
            category,
            finding,
            severity,
            persona,
            embedding: None,
        }
    }
}

/// Whether a severity value is within the accepted [1, 10] range
pub fn severity_in_range(severity: i64) -> bool {
    severity >= SEVERITY_MIN as i64 && severity <= SEVERITY_MAX as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_bounds() {
        assert!(!severity_in_range(0));
        assert!(severity_in_range(1));
        assert!(severity_in_range(10));
        assert!(!severity_in_range(11));
        assert!(!severity_in_range(-3));
    }

    #[test]
    fn persona_round_trips() {
        assert_eq!(Persona::parse("systems"), Some(Persona::Systems));
        assert_eq!(Persona::parse("operations"), Some(Persona::Operations));
        assert_eq!(Persona::parse("bizops"), None);
        assert_eq!(Persona::Systems.as_str(), "systems");
    }

    #[test]
    fn new_blueprint_has_no_diagram_or_analyses() {
        let bp = Blueprint::new(
            Uuid::new_v4(),
            "Event-Driven Microservices".to_string(),
            "services communicating over a message bus".to_string(),
            vec![],
            vec![],
        );
        assert!(bp.diagram.is_none());
        assert!(bp.analyses.is_empty());
    }
}
