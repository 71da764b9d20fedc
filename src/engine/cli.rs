// ABOUTME: Engine implementation driving the docker/podman command-line client.
// ABOUTME: Runs through any CommandRunner, so local shells and SSH sessions behave alike.

use crate::engine::traits::{
    ContainerError, ContainerFilters, ContainerOps, ContainerSummary, ImageError, ImageFilter,
    ImageOps, ImageSummary, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
    container_status_from_state,
};
use crate::engine::types::RuntimeType;
use crate::shell::{CommandOutput, CommandRunner, RunError, quote};
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

const FIELD_SEP: char = '|';
const INSPECT_FORMAT: &str = "{{.Id}}|{{.Parent}}|{{join .RepoTags \",\"}}|{{.Created}}|{{.Size}}";
const PS_FORMAT: &str = "{{.ID}}|{{.Names}}|{{.Image}}|{{.State}}";
const CONTAINER_IMAGE_FORMAT: &str = "{{.Id}}|{{.Image}}";

/// How a failed client invocation should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    NotFound,
    Conflict,
    Unavailable,
    Other,
}

/// Classify a client's stderr. Docker and Podman phrase the same conditions differently.
fn classify(stderr: &str) -> Failure {
    let text = stderr.to_ascii_lowercase();
    const UNAVAILABLE: [&str; 5] = [
        "cannot connect to the docker daemon",
        "is the docker daemon running",
        "unable to connect to podman",
        "connection refused",
        "command not found",
    ];
    const NOT_FOUND: [&str; 4] = ["no such image", "no such container", "image not known", "no container with name or id"];
    const CONFLICT: [&str; 6] = [
        "conflict",
        "being used",
        "in use",
        "dependent child",
        "must be forced",
        "cannot be forced",
    ];

    if UNAVAILABLE.iter().any(|p| text.contains(p)) {
        Failure::Unavailable
    } else if NOT_FOUND.iter().any(|p| text.contains(p)) {
        Failure::NotFound
    } else if CONFLICT.iter().any(|p| text.contains(p)) {
        Failure::Conflict
    } else {
        Failure::Other
    }
}

fn image_failure(output: &CommandOutput, id: &str) -> ImageError {
    let message = output.stderr.trim().to_string();
    match classify(&message) {
        Failure::NotFound => ImageError::NotFound(id.to_string()),
        Failure::Conflict => ImageError::Conflict(message),
        Failure::Unavailable => ImageError::Unavailable(message),
        Failure::Other => ImageError::Runtime(format!("exit {}: {}", output.exit_code, message)),
    }
}

fn container_failure(output: &CommandOutput, id: &str) -> ContainerError {
    let message = output.stderr.trim().to_string();
    match classify(&message) {
        Failure::NotFound => ContainerError::NotFound(id.to_string()),
        Failure::Conflict => ContainerError::Conflict(message),
        Failure::Unavailable => ContainerError::Unavailable(message),
        Failure::Other => {
            ContainerError::Runtime(format!("exit {}: {}", output.exit_code, message))
        }
    }
}

/// Parse the timestamp forms Docker (RFC 3339) and Podman (Go `time.Time`) print.
pub(crate) fn parse_created(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // "2024-05-01 10:00:00.123456 +0000 UTC": drop the zone abbreviation.
    let mut parts: Vec<&str> = raw.split_whitespace().collect();
    if parts.len() == 4 {
        parts.pop();
    }
    let joined = parts.join(" ");
    if let Ok(ts) = DateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse one line produced by [`INSPECT_FORMAT`].
pub(crate) fn parse_inspect_line(line: &str) -> Option<ImageSummary> {
    let mut fields = line.trim().splitn(5, FIELD_SEP);
    let id = fields.next().filter(|s| !s.is_empty())?;
    let parent = fields.next()?.trim();
    let tags = fields.next()?;
    let created = fields.next()?;
    let size = fields.next()?;

    Some(ImageSummary {
        id: ImageId::new(id),
        tags: tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty() && !t.ends_with(":<none>"))
            .map(str::to_string)
            .collect(),
        parent: (!parent.is_empty()).then(|| ImageId::new(parent)),
        created: parse_created(created).unwrap_or_default(),
        size: size.trim().parse().unwrap_or(0),
    })
}

/// Parse one line produced by [`PS_FORMAT`].
///
/// `ps` cannot print the image ID, so it comes from `image_ids`; a container
/// missing there vanished between the two calls and is skipped.
pub(crate) fn parse_ps_line(
    line: &str,
    image_ids: &HashMap<ContainerId, ImageId>,
) -> Option<ContainerSummary> {
    let mut fields = line.trim().splitn(4, FIELD_SEP);
    let id = ContainerId::new(fields.next().filter(|s| !s.is_empty())?);
    let name = fields.next()?;
    let image = fields.next()?;
    let state = fields.next()?;
    let image_id = image_ids.get(&id)?.clone();

    Some(ContainerSummary {
        id,
        name: name.split(',').next().unwrap_or(name).to_string(),
        image: image.to_string(),
        image_id,
        status: container_status_from_state(state),
    })
}

/// Parse one line produced by [`CONTAINER_IMAGE_FORMAT`].
pub(crate) fn parse_container_image_line(line: &str) -> Option<(ContainerId, ImageId)> {
    let (id, image) = line.trim().split_once(FIELD_SEP)?;
    if id.is_empty() || image.is_empty() {
        return None;
    }
    Some((ContainerId::new(id), ImageId::new(image)))
}

fn unique_lines(stdout: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| seen.insert(l.to_string()))
        .map(str::to_string)
        .collect()
}

/// Engine reached through its command-line client.
pub struct CliEngine {
    runner: Arc<dyn CommandRunner>,
    runtime_type: RuntimeType,
}

impl CliEngine {
    pub fn new(runner: Arc<dyn CommandRunner>, runtime_type: RuntimeType) -> Self {
        Self {
            runner,
            runtime_type,
        }
    }

    fn command(&self, args: &[&str]) -> String {
        std::iter::once(self.runtime_type.binary().to_string())
            .chain(args.iter().map(|a| quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn invoke(&self, args: &[&str]) -> Result<CommandOutput, RunError> {
        let command = self.command(args);
        tracing::debug!(%command, "engine client call");
        self.runner.run(&command).await
    }

    /// IDs from `image ls -q`, de-duplicated in listing order.
    async fn image_ids(&self, args: &[&str]) -> Result<Vec<String>, ImageError> {
        let output = self
            .invoke(args)
            .await
            .map_err(|e| ImageError::Unavailable(e.to_string()))?;
        if !output.success() {
            return Err(image_failure(&output, "list"));
        }
        Ok(unique_lines(&output.stdout))
    }

    /// Inspect `ids`, keeping their order. IDs that vanished meanwhile are skipped.
    async fn inspect_images(&self, ids: &[String]) -> Result<Vec<ImageSummary>, ImageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = vec!["image", "inspect", "--format", INSPECT_FORMAT];
        args.extend(ids.iter().map(String::as_str));
        let output = self
            .invoke(&args)
            .await
            .map_err(|e| ImageError::Unavailable(e.to_string()))?;

        if !output.success() && classify(&output.stderr) != Failure::NotFound {
            return Err(image_failure(&output, "inspect"));
        }

        let mut by_id: HashMap<ImageId, ImageSummary> = output
            .stdout
            .lines()
            .filter_map(parse_inspect_line)
            .map(|img| (img.id.clone(), img))
            .collect();

        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(&ImageId::new(id.as_str())))
            .collect())
    }

    /// Image ID of each container in `ids`. Containers that vanished are absent.
    async fn container_images(
        &self,
        ids: &[&str],
    ) -> Result<HashMap<ContainerId, ImageId>, ContainerError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut args = vec!["container", "inspect", "--format", CONTAINER_IMAGE_FORMAT];
        args.extend(ids.iter().copied());
        let output = self
            .invoke(&args)
            .await
            .map_err(|e| ContainerError::Unavailable(e.to_string()))?;

        if !output.success() && classify(&output.stderr) != Failure::NotFound {
            return Err(container_failure(&output, "inspect"));
        }

        Ok(output
            .stdout
            .lines()
            .filter_map(parse_container_image_line)
            .collect())
    }
}

#[async_trait]
impl RuntimeInfo for CliEngine {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let format = match self.runtime_type {
            RuntimeType::Docker => "{{.ServerVersion}}|{{.OperatingSystem}}|{{.Architecture}}",
            RuntimeType::Podman => "{{.Version.Version}}|{{.Host.Distribution.Distribution}}|{{.Host.Arch}}",
        };
        let output = self
            .invoke(&["info", "--format", format])
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        if !output.success() {
            return Err(RuntimeInfoError::ConnectionFailed(
                output.stderr.trim().to_string(),
            ));
        }

        let mut fields = output.stdout.trim().splitn(3, FIELD_SEP);
        let mut next = || fields.next().unwrap_or_default().to_string();
        Ok(RuntimeMetadata {
            name: self.runtime_type.to_string(),
            version: next(),
            os: next(),
            arch: next(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        let output = self
            .invoke(&["version"])
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(RuntimeInfoError::ConnectionFailed(
                output.stderr.trim().to_string(),
            ))
        }
    }
}

#[async_trait]
impl ImageOps for CliEngine {
    async fn list_images(&self, filter: ImageFilter) -> Result<Vec<ImageSummary>, ImageError> {
        let mut args = vec!["image", "ls", "-q", "--no-trunc"];
        if filter == ImageFilter::Dangling {
            args.extend(["--filter", "dangling=true"]);
        }
        let ids = self.image_ids(&args).await?;
        let images = self.inspect_images(&ids).await?;
        Ok(images
            .into_iter()
            .filter(|img| filter == ImageFilter::All || img.is_dangling())
            .collect())
    }

    async fn list_children(&self, parent: &ImageId) -> Result<Vec<ImageSummary>, ImageError> {
        let ids = self
            .image_ids(&["image", "ls", "-a", "-q", "--no-trunc"])
            .await?;
        let images = self.inspect_images(&ids).await?;
        Ok(images
            .into_iter()
            .filter(|img| img.parent.as_ref() == Some(parent))
            .collect())
    }

    async fn remove_image(&self, id: &ImageId, force: bool) -> Result<(), ImageError> {
        let mut args = vec!["image", "rm"];
        if force {
            args.push("--force");
        }
        args.push(id.as_str());

        let output = self
            .invoke(&args)
            .await
            .map_err(|e| ImageError::Unavailable(e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(image_failure(&output, id.as_str()))
        }
    }
}

#[async_trait]
impl ContainerOps for CliEngine {
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let ancestor = filters
            .ancestor
            .as_ref()
            .map(|image| format!("ancestor={}", image.as_str()));

        let mut args = vec!["ps", "--no-trunc", "--format", PS_FORMAT];
        if filters.all {
            args.push("-a");
        }
        if let Some(ref ancestor) = ancestor {
            args.extend(["--filter", ancestor.as_str()]);
        }

        let output = self
            .invoke(&args)
            .await
            .map_err(|e| ContainerError::Unavailable(e.to_string()))?;
        if !output.success() {
            return Err(container_failure(&output, "list"));
        }

        let lines: Vec<&str> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let ids: Vec<&str> = lines
            .iter()
            .filter_map(|l| l.split(FIELD_SEP).next())
            .filter(|id| !id.is_empty())
            .collect();
        let image_ids = self.container_images(&ids).await?;

        Ok(lines
            .iter()
            .filter_map(|l| parse_ps_line(l, &image_ids))
            .collect())
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let mut args = vec!["rm"];
        if force {
            args.push("--force");
        }
        args.push(id.as_str());

        let output = self
            .invoke(&args)
            .await
            .map_err(|e| ContainerError::Unavailable(e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(container_failure(&output, id.as_str()))
        }
    }
}
