// ABOUTME: Reconciliation driver that walks a deletion batch through escalating rounds.
// ABOUTME: One handler per BatchState; the operator is asked only between rounds.

use std::collections::{HashMap, HashSet};

use crate::diagnostics::{Diagnostics, Warning};
use crate::engine::{ContainerError, ContainerOps, ContainerSummary, ImageError, ImageFilter, ImageOps};
use crate::inventory::Inventory;
use crate::output::Output;
use crate::prompt::Prompt;
use crate::types::{ContainerId, ImageId};

use super::batch::DeletionBatch;
use super::diagnosis::{BlockCause, Diagnosis};
use super::error::ReconcileError;
use super::report::{KeptImage, KeptReason, Report};
use super::state::BatchState;

const FIRST_PASS_ROUND: u32 = 1;
const RETRY_ROUND: u32 = 2;
const FORCE_ROUND: u32 = 3;

/// Collaborators for one run: the engine, the operator, and the console.
pub struct ReconcileContext<'a, E: ?Sized> {
    pub engine: &'a E,
    pub prompt: &'a mut dyn Prompt,
    pub output: &'a Output,
}

impl<'a, E: ?Sized> ReconcileContext<'a, E> {
    pub fn new(engine: &'a E, prompt: &'a mut dyn Prompt, output: &'a Output) -> Self {
        Self {
            engine,
            prompt,
            output,
        }
    }
}

/// Outcome of a single image delete.
enum Attempt {
    Deleted,
    AlreadyGone,
    Refused(String),
}

/// Drives one `DeletionBatch` to a terminal partition.
pub struct Reconciler<'a, E: ?Sized> {
    ctx: ReconcileContext<'a, E>,
    state: BatchState,
    batch: DeletionBatch,
    labels: HashMap<ImageId, String>,
    refusals: HashMap<ImageId, String>,
    diagnoses: HashMap<ImageId, Diagnosis>,
    reasons: HashMap<ImageId, KeptReason>,
    removed_containers: Vec<ContainerId>,
    round: u32,
    diagnostics: Diagnostics,
}

impl<'a, E> Reconciler<'a, E>
where
    E: ImageOps + ContainerOps + ?Sized,
{
    pub fn new(ctx: ReconcileContext<'a, E>, candidates: impl IntoIterator<Item = ImageId>) -> Self {
        Self {
            ctx,
            state: BatchState::Initial,
            batch: DeletionBatch::new(candidates),
            labels: HashMap::new(),
            refusals: HashMap::new(),
            diagnoses: HashMap::new(),
            reasons: HashMap::new(),
            removed_containers: Vec::new(),
            round: 0,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Human names shown next to IDs in diagnoses.
    pub fn with_labels(mut self, labels: HashMap<ImageId, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn batch(&self) -> &DeletionBatch {
        &self.batch
    }

    /// Latest diagnosis for `id`, if it has been diagnosed.
    pub fn diagnosis(&self, id: &ImageId) -> Option<&Diagnosis> {
        self.diagnoses.get(id)
    }

    /// Run the handler for the current state and move to the next one.
    ///
    /// `Terminal` is absorbing. An unreachable engine ends the run with an
    /// error; the batch keeps whatever partition it had reached.
    pub async fn step(&mut self) -> Result<BatchState, ReconcileError> {
        let next = match self.state {
            BatchState::Initial => self.first_pass().await?,
            BatchState::FirstPass => self.diagnose_failures().await?,
            BatchState::Diagnosed => self.route_diagnosis(),
            BatchState::AwaitContainerRemovalDecision => self.decide_container_removal().await?,
            BatchState::Retried => self.diagnose_remaining().await?,
            BatchState::AwaitForceDecision => self.decide_force().await?,
            BatchState::Terminal => BatchState::Terminal,
        };
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, "batch transition");
        }
        self.state = next;
        Ok(next)
    }

    /// Step until `Terminal` and return the summary.
    pub async fn run(mut self) -> Result<Report, ReconcileError> {
        while !self.state.is_terminal() {
            self.step().await?;
        }
        Ok(self.into_report())
    }

    pub fn into_report(mut self) -> Report {
        let kept = self
            .batch
            .kept()
            .into_iter()
            .map(|id| {
                let diagnosis = self.diagnoses.remove(&id).unwrap_or_else(|| Diagnosis {
                    refusal: self.refusals.get(&id).cloned(),
                    ..Diagnosis::default()
                });
                let reason = self.reasons.remove(&id).unwrap_or(KeptReason::Declined);
                KeptImage {
                    causes: diagnosis.causes(),
                    id,
                    reason,
                    diagnosis,
                }
            })
            .collect();

        Report {
            candidates: self.batch.len(),
            deleted: self.batch.deleted(),
            kept,
            removed_containers: self.removed_containers,
            rounds: self.round,
            warnings: self.diagnostics.into_messages(),
        }
    }

    // =========================================================================
    // State handlers
    // =========================================================================

    async fn first_pass(&mut self) -> Result<BatchState, ReconcileError> {
        if self.batch.is_empty() {
            return Ok(BatchState::Terminal);
        }

        let total = self.batch.len();
        self.ctx.output.progress(&format!("Deleting {total} image(s)..."));
        let deleted = self.plain_pass(FIRST_PASS_ROUND).await?;
        self.ctx
            .output
            .disclose(&[format!("Deleted {deleted} of {total} image(s).")]);
        Ok(BatchState::FirstPass)
    }

    async fn diagnose_failures(&mut self) -> Result<BatchState, ReconcileError> {
        if self.batch.is_settled() {
            return Ok(BatchState::Terminal);
        }
        self.diagnose().await?;
        self.show_diagnosis(&format!(
            "{} image(s) could not be deleted:",
            self.batch.pending_count()
        ));
        Ok(BatchState::Diagnosed)
    }

    fn route_diagnosis(&self) -> BatchState {
        let container_blocked = self
            .batch
            .pending()
            .iter()
            .filter_map(|id| self.diagnoses.get(id))
            .any(|d| d.has(BlockCause::BlockedByContainer));

        if container_blocked {
            BatchState::AwaitContainerRemovalDecision
        } else {
            BatchState::AwaitForceDecision
        }
    }

    async fn decide_container_removal(&mut self) -> Result<BatchState, ReconcileError> {
        let containers = self.blocking_containers();
        let question = format!(
            "Remove {} container(s) blocking these images?",
            containers.len()
        );
        if !self.ctx.prompt.confirm(&question) {
            self.keep_remaining(KeptReason::Declined);
            return Ok(BatchState::Terminal);
        }

        self.remove_containers(containers).await?;
        let deleted = self.plain_pass(RETRY_ROUND).await?;
        self.ctx.output.progress(&format!(
            "Deleted {deleted} more image(s) after removing containers."
        ));
        Ok(BatchState::Retried)
    }

    async fn diagnose_remaining(&mut self) -> Result<BatchState, ReconcileError> {
        if self.batch.is_settled() {
            return Ok(BatchState::Terminal);
        }
        self.diagnose().await?;
        self.show_diagnosis(&format!(
            "{} image(s) still blocked:",
            self.batch.pending_count()
        ));
        Ok(BatchState::AwaitForceDecision)
    }

    async fn decide_force(&mut self) -> Result<BatchState, ReconcileError> {
        let pending = self.batch.pending();
        let question = format!("Force-delete {} remaining image(s)?", pending.len());
        if !self.ctx.prompt.confirm(&question) {
            self.keep_remaining(KeptReason::Declined);
            return Ok(BatchState::Terminal);
        }

        self.round = FORCE_ROUND;
        tracing::info!(round = self.round, pending = pending.len(), "force delete round");
        for id in pending {
            match self.attempt(&id, true).await? {
                Attempt::Deleted | Attempt::AlreadyGone => {
                    self.batch.mark_deleted(&id);
                }
                Attempt::Refused(msg) => {
                    tracing::warn!(image = %id, "force delete refused: {}", msg);
                    if let Some(diagnosis) = self.diagnoses.get_mut(&id) {
                        diagnosis.refusal = Some(msg.clone());
                    }
                    self.batch.keep(&id);
                    self.reasons.insert(id, KeptReason::ForceFailed(msg));
                }
            }
        }
        Ok(BatchState::Terminal)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Plain delete of every pending ID; returns how many went away.
    async fn plain_pass(&mut self, round: u32) -> Result<usize, ReconcileError> {
        self.round = round;
        let pending = self.batch.pending();
        tracing::info!(round, pending = pending.len(), "delete round");

        let mut deleted = 0;
        for id in pending {
            match self.attempt(&id, false).await? {
                Attempt::Deleted | Attempt::AlreadyGone => {
                    self.batch.mark_deleted(&id);
                    deleted += 1;
                }
                Attempt::Refused(msg) => {
                    tracing::debug!(image = %id, "delete refused: {}", msg);
                    self.refusals.insert(id, msg);
                }
            }
        }
        Ok(deleted)
    }

    async fn attempt(&self, id: &ImageId, force: bool) -> Result<Attempt, ReconcileError> {
        tracing::debug!(image = %id, force, "removing image");
        match self.ctx.engine.remove_image(id, force).await {
            Ok(()) => Ok(Attempt::Deleted),
            Err(ImageError::NotFound(_)) => {
                tracing::debug!(image = %id, "image already gone");
                Ok(Attempt::AlreadyGone)
            }
            Err(ImageError::Unavailable(msg)) => Err(ReconcileError::EngineUnavailable(msg)),
            Err(ImageError::Conflict(msg) | ImageError::Runtime(msg)) => Ok(Attempt::Refused(msg)),
        }
    }

    /// Refresh dependents for every pending ID.
    async fn diagnose(&mut self) -> Result<(), ReconcileError> {
        let inventory = Inventory::new(self.ctx.engine);
        for id in self.batch.pending() {
            let dependents = inventory.dependents(&id).await?;
            let refusal = self.refusals.get(&id).cloned();
            self.diagnoses.insert(id, Diagnosis::new(dependents, refusal));
        }
        Ok(())
    }

    fn show_diagnosis(&self, header: &str) {
        let mut lines = vec![header.to_string()];
        for id in self.batch.pending() {
            let Some(diagnosis) = self.diagnoses.get(&id) else {
                continue;
            };
            let causes: Vec<String> = diagnosis.causes().iter().map(ToString::to_string).collect();
            match self.labels.get(&id) {
                Some(label) => lines.push(format!("  {id} {label} [{}]", causes.join(", "))),
                None => lines.push(format!("  {id} [{}]", causes.join(", "))),
            }
            for fact in diagnosis.describe() {
                lines.push(format!("      {fact}"));
            }
        }
        self.ctx.output.disclose(&lines);
    }

    /// Containers found for pending IDs, each once, in discovery order.
    fn blocking_containers(&self) -> Vec<ContainerSummary> {
        let mut seen = HashSet::new();
        self.batch
            .pending()
            .iter()
            .filter_map(|id| self.diagnoses.get(id))
            .flat_map(|d| d.containers.iter())
            .filter(|c| seen.insert(c.id.clone()))
            .cloned()
            .collect()
    }

    /// Force-remove each container; failures become warnings.
    async fn remove_containers(
        &mut self,
        containers: Vec<ContainerSummary>,
    ) -> Result<(), ReconcileError> {
        for container in containers {
            tracing::debug!(container = %container.id, "removing blocking container");
            match self.ctx.engine.remove_container(&container.id, true).await {
                Ok(()) => {
                    self.ctx.output.progress(&format!(
                        "  removed container {} ({})",
                        container.name, container.id
                    ));
                    self.removed_containers.push(container.id);
                }
                Err(ContainerError::NotFound(_)) => {
                    tracing::debug!(container = %container.id, "container already gone");
                }
                Err(ContainerError::Unavailable(msg)) => {
                    return Err(ReconcileError::EngineUnavailable(msg));
                }
                Err(e) => self.diagnostics.warn(Warning::container_removal(format!(
                    "failed to remove container {} ({}): {}",
                    container.name, container.id, e
                ))),
            }
        }
        Ok(())
    }

    fn keep_remaining(&mut self, reason: KeptReason) {
        for id in self.batch.keep_remaining() {
            self.reasons.insert(id, reason.clone());
        }
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Delete every image matching `filter`, escalating as the operator allows.
///
/// An unreachable engine fails before any batch is built.
pub async fn clean_images<E>(
    ctx: ReconcileContext<'_, E>,
    filter: ImageFilter,
) -> Result<Report, ReconcileError>
where
    E: ImageOps + ContainerOps + ?Sized,
{
    let images = Inventory::new(ctx.engine).list_images(filter).await?;
    let labels = images
        .iter()
        .map(|img| (img.id.clone(), img.display_name().to_string()))
        .collect();
    let ids: Vec<ImageId> = images.into_iter().map(|img| img.id).collect();

    Reconciler::new(ctx, ids).with_labels(labels).run().await
}

/// Reconcile an explicit set of image IDs.
pub async fn reconcile<E>(
    ctx: ReconcileContext<'_, E>,
    candidates: Vec<ImageId>,
) -> Result<Report, ReconcileError>
where
    E: ImageOps + ContainerOps + ?Sized,
{
    Reconciler::new(ctx, candidates).run().await
}
