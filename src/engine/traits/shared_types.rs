// ABOUTME: Resource summaries shared across engine capability traits.
// ABOUTME: ImageSummary, ContainerSummary, filters, and runtime metadata.

use crate::types::{ContainerId, ImageId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which images an inventory listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFilter {
    /// Every top-level image.
    #[default]
    All,
    /// Only images without any `repository:tag`.
    Dangling,
}

/// An image resource as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSummary {
    /// Content-derived identity.
    pub id: ImageId,
    /// `repository:tag` references; empty for an untagged image.
    pub tags: Vec<String>,
    /// Image this one was layered on, when the engine reports it.
    pub parent: Option<ImageId>,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Size in bytes.
    pub size: u64,
}

impl ImageSummary {
    /// True when the image carries no human tag.
    pub fn is_dangling(&self) -> bool {
        self.tags.is_empty()
    }

    /// First tag, or `<none>` for dangling images.
    pub fn display_name(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or("<none>")
    }
}

/// Container lifecycle as far as cleanup cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerStatus::Running => f.write_str("running"),
            ContainerStatus::Stopped => f.write_str("stopped"),
        }
    }
}

/// A container resource as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    /// Container ID.
    pub id: ContainerId,
    /// Container name without the leading slash.
    pub name: String,
    /// Image reference the container was created from.
    pub image: String,
    /// ID of that image, resolved by the engine.
    pub image_id: ImageId,
    /// Running or stopped.
    pub status: ContainerStatus,
}

/// Engine version and platform details.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeMetadata {
    /// Runtime name (e.g., "docker", "podman").
    pub name: String,
    /// Server version.
    pub version: String,
    /// Operating system of the engine host.
    pub os: String,
    /// Architecture of the engine host.
    pub arch: String,
}

/// Map the engine's raw state word onto [`ContainerStatus`].
///
/// Anything that is not actively running (created, exited, dead, paused...)
/// counts as stopped for removal purposes.
pub fn container_status_from_state(state: &str) -> ContainerStatus {
    match state.trim().to_ascii_lowercase().as_str() {
        "running" | "restarting" => ContainerStatus::Running,
        s if s.starts_with("up") => ContainerStatus::Running,
        _ => ContainerStatus::Stopped,
    }
}
