// ABOUTME: Container engine access for Docker and Podman.
// ABOUTME: Capability traits, API and CLI implementations, and runtime detection.

mod bollard;
mod cli;
mod detection;
mod error;
pub mod traits;
mod types;

pub use self::bollard::{ApiEngine, connect_via_session};
pub use cli::CliEngine;
pub use detection::{
    DetectionError, default_socket_path, detect_client, detect_local, detect_runtime,
};
pub use error::{EngineError, EngineErrorKind};
pub use traits::*;
pub use types::{DetectedRuntime, RuntimeConfig, RuntimeType, Transport};
