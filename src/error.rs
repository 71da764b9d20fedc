// ABOUTME: Application-wide error types for dregs.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::engine::EngineError;
use crate::inventory::InventoryError;
use crate::reconcile::ReconcileError;
use crate::types::IdError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),

    #[error("{0}")]
    Inventory(#[from] InventoryError),

    #[error("{0}")]
    Reconcile(#[from] ReconcileError),

    #[error("invalid image reference '{reference}': {source}")]
    InvalidReference { reference: String, source: IdError },

    #[error("no image matches {0}")]
    UnknownImage(String),

    #[error("{reference} matches {count} images; use a longer ID")]
    AmbiguousImage { reference: String, count: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
