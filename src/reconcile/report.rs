// ABOUTME: Terminal summary of a reconciliation run.
// ABOUTME: Lists what was deleted and, for everything kept, why.

use super::diagnosis::{BlockCause, Diagnosis};
use crate::types::{ContainerId, ImageId};
use serde::Serialize;

/// Why an image ended the run in `kept`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "kebab-case")]
pub enum KeptReason {
    /// The operator chose not to escalate.
    Declined,
    /// Force delete was attempted and refused.
    ForceFailed(String),
}

/// A kept image with its last known diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeptImage {
    pub id: ImageId,
    pub causes: Vec<BlockCause>,
    pub reason: KeptReason,
    pub diagnosis: Diagnosis,
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Distinct candidates in the batch.
    pub candidates: usize,
    pub deleted: Vec<ImageId>,
    pub kept: Vec<KeptImage>,
    /// Blocking containers removed on the operator's say-so.
    pub removed_containers: Vec<ContainerId>,
    /// Last round that issued deletes: 1 first pass, 2 retry, 3 force.
    pub rounds: u32,
    pub warnings: Vec<String>,
}

impl Report {
    /// True when the batch was empty and nothing was attempted.
    pub fn nothing_to_do(&self) -> bool {
        self.candidates == 0
    }

    pub fn kept_ids(&self) -> Vec<ImageId> {
        self.kept.iter().map(|k| k.id.clone()).collect()
    }

    /// Human-readable summary lines.
    pub fn summary_lines(&self) -> Vec<String> {
        if self.nothing_to_do() {
            return vec!["Nothing to do.".to_string()];
        }

        let mut lines = vec![format!(
            "Deleted {} of {} image(s); kept {}.",
            self.deleted.len(),
            self.candidates,
            self.kept.len()
        )];
        if !self.removed_containers.is_empty() {
            lines.push(format!(
                "Removed {} blocking container(s).",
                self.removed_containers.len()
            ));
        }
        for kept in &self.kept {
            let causes: Vec<String> = kept.causes.iter().map(ToString::to_string).collect();
            let why = match &kept.reason {
                KeptReason::Declined => "remediation declined".to_string(),
                KeptReason::ForceFailed(msg) => format!("force delete failed: {msg}"),
            };
            lines.push(format!("  kept {} [{}] {}", kept.id, causes.join(", "), why));
            for fact in kept.diagnosis.describe() {
                lines.push(format!("      {fact}"));
            }
        }
        lines
    }
}
