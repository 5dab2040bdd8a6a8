//! Project state machine
//!
//! A project progresses through `pending → processing → {completed | error}`.
//! `processing` is entered synchronously once the generation stage succeeds;
//! `completed` is reached only through the completion detector; `error` is
//! terminal and reachable from any later pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Project analysis status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Created, generation not yet finished
    Pending,
    /// Generation succeeded, background analysis in flight
    Processing,
    /// Every expected slot has a persisted blueprint with analyses
    Completed,
    /// A fail-fast pipeline stage failed
    Error,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProjectStatus::Pending),
            "processing" => Some(ProjectStatus::Processing),
            "completed" => Some(ProjectStatus::Completed),
            "error" => Some(ProjectStatus::Error),
            _ => None,
        }
    }

    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Error)
    }
}

/// Status transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub project_id: Uuid,
    pub old_status: ProjectStatus,
    pub new_status: ProjectStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// A submitted project brief and its analysis status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier
    pub id: Uuid,

    /// The user-supplied natural-language brief
    pub brief: String,

    /// Current analysis status
    pub status: ProjectStatus,

    /// Submission time
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a new pending project from a brief
    pub fn new(brief: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            brief,
            status: ProjectStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Transition to a new status, recording the change
    ///
    /// Terminal states never transition: once a project is `completed`
    /// or `error` the status is frozen and `None` is returned.
    pub fn transition_to(&mut self, new_status: ProjectStatus) -> Option<StatusTransition> {
        if self.status.is_terminal() {
            return None;
        }
        let transition = StatusTransition {
            project_id: self.id,
            old_status: self.status,
            new_status,
            transitioned_at: Utc::now(),
        };
        self.status = new_status;
        Some(transition)
    }

    /// Short brief excerpt for status and listing payloads
    pub fn brief_preview(&self, max_chars: usize) -> String {
        if self.brief.chars().count() <= max_chars {
            self.brief.clone()
        } else {
            let truncated: String = self.brief.chars().take(max_chars).collect();
            format!("{}...", truncated)
        }
    }
}
