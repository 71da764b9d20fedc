// ABOUTME: Error types for reconciliation runs.
// ABOUTME: Only conditions that stop a run; refused deletes are not errors.

use crate::inventory::InventoryError;

/// Errors that end a reconciliation run early.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// The engine stopped answering; the run was abandoned as-is.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Dependents or candidates could not be queried.
    #[error("{0}")]
    Inventory(String),
}

impl From<InventoryError> for ReconcileError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::EngineUnavailable(msg) => ReconcileError::EngineUnavailable(msg),
            other => ReconcileError::Inventory(other.to_string()),
        }
    }
}
