// ABOUTME: Engine type definitions for Docker and Podman.
// ABOUTME: RuntimeType, Transport, detection result, and override config.

use serde::{Deserialize, Serialize};

/// The container engine flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl RuntimeType {
    /// Name of the command-line client for this engine.
    pub fn binary(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

/// How engine requests are carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Docker-compatible HTTP API over the engine socket.
    #[default]
    Api,
    /// The engine's command-line client.
    Cli,
}

/// Result of runtime detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedRuntime {
    /// The type of runtime detected.
    pub runtime_type: RuntimeType,
    /// Path to the engine socket.
    pub socket_path: String,
}

/// Explicit engine selection that overrides auto-detection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    /// Engine type.
    #[serde(default)]
    pub runtime: Option<RuntimeType>,
    /// Socket path; defaults to the engine's standard location.
    #[serde(default)]
    pub socket: Option<String>,
    /// Request transport.
    #[serde(default)]
    pub transport: Transport,
}
