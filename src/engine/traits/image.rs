// ABOUTME: Image operations trait for container engines.
// ABOUTME: List images, find child layers, and remove images.

use super::shared_types::{ImageFilter, ImageSummary};
use crate::types::ImageId;
use async_trait::async_trait;

/// Image operations: list, children, remove.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// List images in the engine's native order.
    async fn list_images(&self, filter: ImageFilter) -> Result<Vec<ImageSummary>, ImageError>;

    /// Images (including intermediate layers) whose parent is `parent`.
    async fn list_children(&self, parent: &ImageId) -> Result<Vec<ImageSummary>, ImageError>;

    /// Remove an image. `force` bypasses the in-use safety check.
    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    /// The engine refused because something depends on the image.
    #[error("image is in use: {0}")]
    Conflict(String),

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine error: {0}")]
    Runtime(String),
}
