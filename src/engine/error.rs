// ABOUTME: Engine error types with SNAFU pattern.
// ABOUTME: Unifies detection, connection, and SSH failures for programmatic handling.

use snafu::Snafu;

use super::detection::DetectionError;
use super::traits::RuntimeInfoError;

/// Unified error for bringing up an engine connection.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EngineError {
    #[snafu(display("runtime detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("engine connection failed: {source}"))]
    Connection { source: RuntimeInfoError },

    #[snafu(display("SSH failed: {source}"))]
    Ssh { source: crate::ssh::Error },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// No container runtime found on the host.
    NoRuntimeFound,
    /// SSH transport failure.
    SshError,
    /// Failed to reach the engine.
    ConnectionFailed,
    /// Engine answered with an error.
    RuntimeOperation,
}

impl EngineError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            EngineError::Detection { source } => match source {
                DetectionError::NoRuntimeFound => EngineErrorKind::NoRuntimeFound,
                DetectionError::Probe(_) => EngineErrorKind::SshError,
            },
            EngineError::Connection { source } => match source {
                RuntimeInfoError::ConnectionFailed(_) => EngineErrorKind::ConnectionFailed,
                RuntimeInfoError::Runtime(_) => EngineErrorKind::RuntimeOperation,
            },
            EngineError::Ssh { .. } => EngineErrorKind::SshError,
        }
    }

    /// True when the engine could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self.kind(),
            EngineErrorKind::NoRuntimeFound | EngineErrorKind::ConnectionFailed
        )
    }
}

impl From<DetectionError> for EngineError {
    fn from(source: DetectionError) -> Self {
        EngineError::Detection { source }
    }
}

impl From<RuntimeInfoError> for EngineError {
    fn from(source: RuntimeInfoError) -> Self {
        EngineError::Connection { source }
    }
}

impl From<crate::ssh::Error> for EngineError {
    fn from(source: crate::ssh::Error) -> Self {
        EngineError::Ssh { source }
    }
}
