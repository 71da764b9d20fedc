// ABOUTME: Bollard-based engine implementation.
// ABOUTME: Speaks the Docker-compatible API to Docker or Podman over a Unix socket.

use crate::engine::traits::{
    ContainerError, ContainerFilters, ContainerOps, ContainerSummary, ImageError, ImageFilter,
    ImageOps, ImageSummary, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
    container_status_from_state,
};
use crate::engine::types::{DetectedRuntime, RuntimeType};
use crate::ssh::Session;
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{
    ListContainersOptions, ListImagesOptions, RemoveContainerOptions, RemoveImageOptions,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// Seconds before an API request is abandoned.
const API_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

/// Errors that mean the socket itself could not be used.
fn is_transport_error(e: &bollard::errors::Error) -> bool {
    matches!(
        e,
        bollard::errors::Error::IOError { .. }
            | bollard::errors::Error::HyperResponseError { .. }
            | bollard::errors::Error::RequestTimeoutError
    )
}

fn map_image_error(e: bollard::errors::Error, id: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => ImageError::NotFound(id.to_string()),
        bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message,
        } => ImageError::Conflict(message.clone()),
        _ if is_transport_error(&e) => ImageError::Unavailable(e.to_string()),
        _ => ImageError::Runtime(format!("{}: {}", id, e)),
    }
}

fn map_container_error(e: bollard::errors::Error, id: &str) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => ContainerError::NotFound(id.to_string()),
        bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message,
        } => ContainerError::Conflict(message.clone()),
        _ if is_transport_error(&e) => ContainerError::Unavailable(e.to_string()),
        _ => ContainerError::Runtime(format!("{}: {}", id, e)),
    }
}

// =============================================================================
// ApiEngine
// =============================================================================

/// Engine implementation using bollard.
///
/// Works for both Docker and Podman through the Docker-compatible API.
pub struct ApiEngine {
    client: Docker,
    runtime_type: RuntimeType,
}

impl ApiEngine {
    /// Wrap an existing bollard client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to a socket on this machine.
    pub fn connect(detected: &DetectedRuntime) -> Result<Self, RuntimeInfoError> {
        let client = Docker::connect_with_unix(
            &detected.socket_path,
            API_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, detected.runtime_type))
    }

    async fn raw_images(
        &self,
        all: bool,
        filters: HashMap<String, Vec<String>>,
    ) -> Result<Vec<bollard::models::ImageSummary>, ImageError> {
        let opts = ListImagesOptions {
            all,
            filters: Some(filters),
            ..Default::default()
        };
        self.client
            .list_images(Some(opts))
            .await
            .map_err(|e| map_image_error(e, "list"))
    }
}

/// Connect to the engine on the far side of an SSH session.
///
/// Forwards the detected remote socket to a local one and points bollard at it.
pub async fn connect_via_session(
    session: &Session,
    detected: &DetectedRuntime,
) -> Result<ApiEngine, RuntimeInfoError> {
    let local_socket = session
        .forward_socket(&detected.socket_path)
        .await
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

    let local_socket = local_socket.to_str().ok_or_else(|| {
        RuntimeInfoError::ConnectionFailed("forwarded socket path is not UTF-8".to_string())
    })?;

    let client =
        Docker::connect_with_unix(local_socket, API_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

    Ok(ApiEngine::new(client, detected.runtime_type))
}

/// Older engines report untagged images as `<none>:<none>`.
fn real_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .filter(|t| t != "<none>:<none>" && !t.ends_with(":<none>"))
        .collect()
}

fn summarize_image(raw: bollard::models::ImageSummary) -> ImageSummary {
    let parent = (!raw.parent_id.is_empty()).then(|| ImageId::new(raw.parent_id));
    ImageSummary {
        id: ImageId::new(raw.id),
        tags: real_tags(raw.repo_tags),
        parent,
        created: DateTime::<Utc>::from_timestamp(raw.created, 0).unwrap_or_default(),
        size: u64::try_from(raw.size).unwrap_or(0),
    }
}

#[async_trait]
impl RuntimeInfo for ApiEngine {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        Ok(RuntimeMetadata {
            name: self.runtime_type.to_string(),
            version: info.server_version.unwrap_or_default(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for ApiEngine {
    async fn list_images(&self, filter: ImageFilter) -> Result<Vec<ImageSummary>, ImageError> {
        let mut filters = HashMap::new();
        if filter == ImageFilter::Dangling {
            filters.insert("dangling".to_string(), vec!["true".to_string()]);
        }

        let images = self.raw_images(false, filters).await?;
        Ok(images
            .into_iter()
            .map(summarize_image)
            .filter(|img| filter == ImageFilter::All || img.is_dangling())
            .collect())
    }

    async fn list_children(&self, parent: &ImageId) -> Result<Vec<ImageSummary>, ImageError> {
        let images = self.raw_images(true, HashMap::new()).await?;
        Ok(images
            .into_iter()
            .map(summarize_image)
            .filter(|img| img.parent.as_ref() == Some(parent))
            .collect())
    }

    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(id.as_str(), Some(opts), None)
            .await
            .map_err(|e| map_image_error(e, id.as_str()))?;
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for ApiEngine {
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(ref image) = filters.ancestor {
            filter_map.insert("ancestor".to_string(), vec![image.as_str().to_string()]);
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        // Podman can report transient states ("stopping") that bollard fails
        // to deserialize; retry a couple of times before giving up.
        let mut attempt = 0;
        let containers = loop {
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => break containers,
                Err(e) if attempt < 2 && e.to_string().contains("unknown variant") => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Err(e) => return Err(map_container_error(e, "list")),
            }
        };

        Ok(containers
            .into_iter()
            .map(|c| {
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();
                let state = c
                    .state
                    .map(|s| format!("{:?}", s))
                    .unwrap_or_default();

                ContainerSummary {
                    id: ContainerId::new(c.id.unwrap_or_default()),
                    name,
                    image: c.image.unwrap_or_default(),
                    image_id: ImageId::new(c.image_id.unwrap_or_default()),
                    status: container_status_from_state(&state),
                }
            })
            .collect())
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(|e| map_container_error(e, id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_tags_are_dropped() {
        let tags = vec![
            "<none>:<none>".to_string(),
            "app:1.0".to_string(),
            "app:<none>".to_string(),
        ];
        assert_eq!(real_tags(tags), vec!["app:1.0".to_string()]);
    }

    #[test]
    fn server_errors_map_by_status() {
        let conflict = bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message: "image has dependent child images".to_string(),
        };
        assert_eq!(
            map_image_error(conflict, "abc"),
            ImageError::Conflict("image has dependent child images".to_string())
        );

        let missing = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such image".to_string(),
        };
        assert_eq!(
            map_image_error(missing, "abc"),
            ImageError::NotFound("abc".to_string())
        );
    }
}
