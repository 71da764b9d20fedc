// ABOUTME: Stubborn-image reconciliation: delete, diagnose, remediate, summarize.
// ABOUTME: A batch moves through a fixed state machine until nothing is pending.

mod batch;
mod diagnosis;
mod driver;
mod error;
mod report;
mod state;

pub use batch::{DeletionBatch, Disposition};
pub use diagnosis::{BlockCause, Diagnosis};
pub use driver::{ReconcileContext, Reconciler, clean_images, reconcile};
pub use error::ReconcileError;
pub use report::{KeptImage, KeptReason, Report};
pub use state::BatchState;
