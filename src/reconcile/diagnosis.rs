// ABOUTME: Classification of why an image resisted deletion.
// ABOUTME: Blocked by containers, by child images, or for a reason the engine did not report.

use crate::engine::{ContainerSummary, ImageSummary};
use crate::inventory::Dependents;
use serde::Serialize;

/// Root cause of a refused delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockCause {
    /// At least one container references the image.
    BlockedByContainer,
    /// At least one image is layered on this one.
    BlockedByChild,
    /// The engine refused without a visible dependent.
    BlockedOther,
}

impl std::fmt::Display for BlockCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockCause::BlockedByContainer => f.write_str("blocked-by-container"),
            BlockCause::BlockedByChild => f.write_str("blocked-by-child"),
            BlockCause::BlockedOther => f.write_str("blocked-other"),
        }
    }
}

/// Dependency facts for one blocked image, plus the engine's refusal message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnosis {
    pub containers: Vec<ContainerSummary>,
    pub children: Vec<ImageSummary>,
    /// What the engine said when it last refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
}

impl Diagnosis {
    pub fn new(dependents: Dependents, refusal: Option<String>) -> Self {
        Self {
            containers: dependents.containers,
            children: dependents.children,
            refusal,
        }
    }

    /// Every cause that applies; never empty.
    pub fn causes(&self) -> Vec<BlockCause> {
        let mut causes = Vec::with_capacity(2);
        if !self.containers.is_empty() {
            causes.push(BlockCause::BlockedByContainer);
        }
        if !self.children.is_empty() {
            causes.push(BlockCause::BlockedByChild);
        }
        if causes.is_empty() {
            causes.push(BlockCause::BlockedOther);
        }
        causes
    }

    pub fn has(&self, cause: BlockCause) -> bool {
        self.causes().contains(&cause)
    }

    /// One line per fact, indented for display under the image line.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.containers.is_empty() {
            let names: Vec<String> = self
                .containers
                .iter()
                .map(|c| {
                    let label = if c.name.is_empty() { c.id.to_string() } else { c.name.clone() };
                    format!("{} ({})", label, c.status)
                })
                .collect();
            lines.push(format!(
                "used by {} container(s): {}",
                self.containers.len(),
                names.join(", ")
            ));
        }
        if !self.children.is_empty() {
            let children: Vec<String> = self
                .children
                .iter()
                .map(|img| format!("{} {}", img.id, img.display_name()))
                .collect();
            lines.push(format!(
                "has {} child image(s): {}",
                self.children.len(),
                children.join(", ")
            ));
        }
        if lines.is_empty() {
            lines.push(format!(
                "refused: {}",
                self.refusal.as_deref().unwrap_or("no reason reported")
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ContainerStatus;
    use crate::types::{ContainerId, ImageId};

    fn container(name: &str) -> ContainerSummary {
        ContainerSummary {
            id: ContainerId::new(format!("{name}-id")),
            name: name.to_string(),
            image: "img".to_string(),
            image_id: ImageId::new("img"),
            status: ContainerStatus::Stopped,
        }
    }

    fn child(id: &str) -> ImageSummary {
        ImageSummary {
            id: ImageId::new(id),
            tags: vec![],
            parent: Some(ImageId::new("parent")),
            created: Default::default(),
            size: 0,
        }
    }

    #[test]
    fn no_dependents_is_blocked_other() {
        let diagnosis = Diagnosis::new(Dependents::default(), Some("busy".to_string()));
        assert_eq!(diagnosis.causes(), vec![BlockCause::BlockedOther]);
        assert_eq!(diagnosis.describe(), vec!["refused: busy"]);
    }

    #[test]
    fn both_causes_are_reported() {
        let diagnosis = Diagnosis::new(
            Dependents {
                containers: vec![container("web")],
                children: vec![child("kid")],
            },
            None,
        );
        assert_eq!(
            diagnosis.causes(),
            vec![BlockCause::BlockedByContainer, BlockCause::BlockedByChild]
        );
        let lines = diagnosis.describe();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("web (stopped)"));
        assert!(lines[1].contains("kid <none>"));
    }
}
