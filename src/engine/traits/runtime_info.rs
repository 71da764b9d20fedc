// ABOUTME: Runtime info trait for container engines.
// ABOUTME: Query engine version and check connectivity.

use super::shared_types::RuntimeMetadata;
use async_trait::async_trait;

/// Runtime metadata operations.
#[async_trait]
pub trait RuntimeInfo: Send + Sync {
    /// Get engine version and platform.
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError>;

    /// Check that the engine answers at all.
    async fn ping(&self) -> Result<(), RuntimeInfoError>;
}

/// Errors from runtime info operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
