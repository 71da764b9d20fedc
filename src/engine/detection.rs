// ABOUTME: Engine detection for the local host and for hosts reached via a CommandRunner.
// ABOUTME: Checks Podman sockets first, then Docker; explicit config wins.

use super::types::{DetectedRuntime, RuntimeConfig, RuntimeType};
use crate::shell::{CommandRunner, RunError, quote};
use std::path::Path;

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker)")]
    NoRuntimeFound,

    #[error("probe command failed: {0}")]
    Probe(#[from] RunError),
}

fn rootless_podman(uid: &str) -> String {
    format!("/run/user/{}/podman/podman.sock", uid)
}

/// Default socket for an engine, given the user's uid when known.
pub fn default_socket_path(runtime: RuntimeType, uid: Option<&str>) -> String {
    match (runtime, uid) {
        (RuntimeType::Docker, _) => DOCKER_SOCKET.to_string(),
        (RuntimeType::Podman, Some(uid)) if uid != "0" => rootless_podman(uid),
        (RuntimeType::Podman, _) => ROOTFUL_PODMAN.to_string(),
    }
}

fn explicit(config: Option<&RuntimeConfig>, uid: Option<&str>) -> Option<DetectedRuntime> {
    let cfg = config?;
    let runtime_type = cfg.runtime?;
    Some(DetectedRuntime {
        runtime_type,
        socket_path: cfg
            .socket
            .clone()
            .unwrap_or_else(|| default_socket_path(runtime_type, uid)),
    })
}

/// Socket candidates in detection order.
fn candidates(uid: Option<&str>) -> Vec<DetectedRuntime> {
    let mut found = Vec::with_capacity(3);
    if let Some(uid) = uid {
        found.push(DetectedRuntime {
            runtime_type: RuntimeType::Podman,
            socket_path: rootless_podman(uid),
        });
    }
    found.push(DetectedRuntime {
        runtime_type: RuntimeType::Podman,
        socket_path: ROOTFUL_PODMAN.to_string(),
    });
    found.push(DetectedRuntime {
        runtime_type: RuntimeType::Docker,
        socket_path: DOCKER_SOCKET.to_string(),
    });
    found
}

/// Detect the engine socket on this machine.
///
/// Detection order:
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
pub fn detect_local(config: Option<&RuntimeConfig>) -> Result<DetectedRuntime, DetectionError> {
    let uid = local_uid();
    if let Some(found) = explicit(config, uid.as_deref()) {
        return Ok(found);
    }

    candidates(uid.as_deref())
        .into_iter()
        .find(|c| Path::new(&c.socket_path).exists())
        .ok_or(DetectionError::NoRuntimeFound)
}

fn local_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()?
            .lines()
            .find(|l| l.starts_with("Uid:"))?
            .split_whitespace()
            .nth(1)
            .map(str::to_string)
    })
}

async fn remote_uid<R: CommandRunner + ?Sized>(runner: &R) -> Result<Option<String>, RunError> {
    let output = runner.run("id -u").await?;
    Ok(output
        .success()
        .then(|| output.stdout.trim().to_string())
        .filter(|uid| !uid.is_empty()))
}

/// Detect the engine socket wherever `runner` executes, in the same order as
/// [`detect_local`].
pub async fn detect_runtime<R: CommandRunner + ?Sized>(
    runner: &R,
    config: Option<&RuntimeConfig>,
) -> Result<DetectedRuntime, DetectionError> {
    let uid = remote_uid(runner).await?;
    if let Some(found) = explicit(config, uid.as_deref()) {
        return Ok(found);
    }

    for candidate in candidates(uid.as_deref()) {
        let probe = runner
            .run(&format!("test -S {}", quote(&candidate.socket_path)))
            .await?;
        if probe.success() {
            tracing::debug!(socket = %candidate.socket_path, "found engine socket");
            return Ok(candidate);
        }
    }

    Err(DetectionError::NoRuntimeFound)
}

/// Detect which engine client binary is installed where `runner` executes.
///
/// Used by the CLI transport, which needs a client rather than a socket.
pub async fn detect_client<R: CommandRunner + ?Sized>(
    runner: &R,
    config: Option<&RuntimeConfig>,
) -> Result<RuntimeType, DetectionError> {
    if let Some(runtime) = config.and_then(|c| c.runtime) {
        return Ok(runtime);
    }

    for runtime in [RuntimeType::Podman, RuntimeType::Docker] {
        let probe = runner
            .run(&format!("command -v {}", runtime.binary()))
            .await?;
        if probe.success() {
            return Ok(runtime);
        }
    }

    Err(DetectionError::NoRuntimeFound)
}
