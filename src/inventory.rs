// ABOUTME: Resource inventory query over an engine.
// ABOUTME: Lists images by filter and reports which containers and child images depend on one.

use crate::engine::{
    ContainerError, ContainerFilters, ContainerOps, ContainerSummary, ImageError, ImageFilter,
    ImageOps, ImageSummary,
};
use crate::types::ImageId;
use serde::Serialize;

/// Errors from inventory queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    /// The engine could not be reached at all.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("inventory query failed: {0}")]
    Query(String),
}

impl From<ImageError> for InventoryError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Unavailable(msg) => InventoryError::EngineUnavailable(msg),
            other => InventoryError::Query(other.to_string()),
        }
    }
}

impl From<ContainerError> for InventoryError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::Unavailable(msg) => InventoryError::EngineUnavailable(msg),
            other => InventoryError::Query(other.to_string()),
        }
    }
}

/// Everything that references an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dependents {
    /// Containers created from the image, running or stopped.
    pub containers: Vec<ContainerSummary>,
    /// Images whose parent is the image.
    pub children: Vec<ImageSummary>,
}

impl Dependents {
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.children.is_empty()
    }
}

/// Read-only view of the engine's image inventory.
///
/// Holds no state between calls; every query goes to the engine.
pub struct Inventory<'a, E: ?Sized> {
    engine: &'a E,
}

impl<'a, E> Inventory<'a, E>
where
    E: ImageOps + ContainerOps + ?Sized,
{
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Images matching `filter`, in the engine's order.
    ///
    /// `Dangling` results are re-checked so a tagged image never slips through.
    pub async fn list_images(&self, filter: ImageFilter) -> Result<Vec<ImageSummary>, InventoryError> {
        let images = self.engine.list_images(filter).await?;
        tracing::debug!(?filter, count = images.len(), "listed images");
        Ok(images
            .into_iter()
            .filter(|img| filter == ImageFilter::All || img.is_dangling())
            .collect())
    }

    /// Containers and child images referencing `id`.
    ///
    /// An image that has vanished since it was listed has no dependents.
    pub async fn dependents(&self, id: &ImageId) -> Result<Dependents, InventoryError> {
        // The ancestor filter also matches containers of descendant images.
        let containers = match self.engine.list_containers(&ContainerFilters::using(id)).await {
            Ok(containers) => containers
                .into_iter()
                .filter(|c| &c.image_id == id)
                .collect::<Vec<_>>(),
            Err(ContainerError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let children = match self.engine.list_children(id).await {
            Ok(children) => children,
            Err(ImageError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            image = %id,
            containers = containers.len(),
            children = children.len(),
            "resolved dependents"
        );

        Ok(Dependents {
            containers,
            children,
        })
    }
}

/// Images that `reference` names: a full ID, an ID prefix, or a tag.
///
/// A bare repository also matches its `:latest` tag. An exact ID or tag
/// match wins over prefix matches.
pub fn select<'i>(images: &'i [ImageSummary], reference: &str) -> Vec<&'i ImageSummary> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Vec::new();
    }
    let id = reference.strip_prefix("sha256:").unwrap_or(reference);
    let latest = format!("{reference}:latest");

    let exact: Vec<_> = images
        .iter()
        .filter(|img| {
            img.id.as_str() == id || img.tags.iter().any(|t| t == reference || *t == latest)
        })
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    images
        .iter()
        .filter(|img| img.id.as_str().starts_with(id))
        .collect()
}
