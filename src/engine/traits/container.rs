// ABOUTME: Container operations trait for container engines.
// ABOUTME: List containers (optionally by ancestor image) and remove them.

use super::shared_types::ContainerSummary;
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;

/// Container operations needed for cleanup.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;

    /// Remove a container. `force` kills a running container first.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Include stopped containers.
    pub all: bool,
    /// Only containers created from this image or an image built on it.
    pub ancestor: Option<ImageId>,
}

impl ContainerFilters {
    /// Every container, running or not, based on `image` or its descendants.
    pub fn using(image: &ImageId) -> Self {
        Self {
            all: true,
            ancestor: Some(image.clone()),
        }
    }
}

/// Errors from container operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    /// The engine refused, e.g. removing a running container without force.
    #[error("container conflict: {0}")]
    Conflict(String),

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine error: {0}")]
    Runtime(String),
}
