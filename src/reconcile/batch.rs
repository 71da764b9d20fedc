// ABOUTME: Deletion batch partitioned into pending, deleted, and kept image IDs.
// ABOUTME: Each ID has exactly one disposition, so the three sets never overlap.

use crate::types::ImageId;
use serde::Serialize;
use std::collections::HashMap;

/// Where an image stands within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Not yet deleted; may still be retried.
    Pending,
    /// Gone from the engine.
    Deleted,
    /// Left in place for the rest of the run.
    Kept,
}

/// The set of image IDs selected for one reconciliation run.
///
/// Candidate order is preserved and duplicate candidates collapse to one
/// entry. Only `Pending` entries move; `Deleted` and `Kept` are final.
#[derive(Debug, Clone, Default)]
pub struct DeletionBatch {
    order: Vec<ImageId>,
    status: HashMap<ImageId, Disposition>,
}

impl DeletionBatch {
    pub fn new(candidates: impl IntoIterator<Item = ImageId>) -> Self {
        let mut batch = Self::default();
        for id in candidates {
            if !batch.status.contains_key(&id) {
                batch.status.insert(id.clone(), Disposition::Pending);
                batch.order.push(id);
            }
        }
        batch
    }

    /// Number of distinct candidates.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Every candidate, in original order.
    pub fn members(&self) -> &[ImageId] {
        &self.order
    }

    pub fn disposition(&self, id: &ImageId) -> Option<Disposition> {
        self.status.get(id).copied()
    }

    fn with(&self, wanted: Disposition) -> Vec<ImageId> {
        self.order
            .iter()
            .filter(|id| self.status.get(*id) == Some(&wanted))
            .cloned()
            .collect()
    }

    pub fn pending(&self) -> Vec<ImageId> {
        self.with(Disposition::Pending)
    }

    pub fn deleted(&self) -> Vec<ImageId> {
        self.with(Disposition::Deleted)
    }

    pub fn kept(&self) -> Vec<ImageId> {
        self.with(Disposition::Kept)
    }

    pub fn pending_count(&self) -> usize {
        self.status
            .values()
            .filter(|d| **d == Disposition::Pending)
            .count()
    }

    /// True once nothing is pending.
    pub fn is_settled(&self) -> bool {
        self.pending_count() == 0
    }

    fn settle(&mut self, id: &ImageId, to: Disposition) -> bool {
        match self.status.get_mut(id) {
            Some(current) if *current == Disposition::Pending => {
                *current = to;
                true
            }
            _ => false,
        }
    }

    /// Move a pending ID to `deleted`. Returns false if it was not pending.
    pub fn mark_deleted(&mut self, id: &ImageId) -> bool {
        self.settle(id, Disposition::Deleted)
    }

    /// Move a pending ID to `kept`. Returns false if it was not pending.
    pub fn keep(&mut self, id: &ImageId) -> bool {
        self.settle(id, Disposition::Kept)
    }

    /// Move every pending ID to `kept`, returning them.
    pub fn keep_remaining(&mut self) -> Vec<ImageId> {
        let remaining = self.pending();
        for id in &remaining {
            self.keep(id);
        }
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ImageId> {
        names.iter().map(|n| ImageId::new(*n)).collect()
    }

    #[test]
    fn duplicates_collapse_in_order() {
        let batch = DeletionBatch::new(ids(&["b", "a", "b", "sha256:a"]));
        assert_eq!(batch.members(), ids(&["b", "a"]).as_slice());
        assert_eq!(batch.pending_count(), 2);
    }

    #[test]
    fn settled_ids_do_not_move_again() {
        let mut batch = DeletionBatch::new(ids(&["a", "b"]));
        let a = ImageId::new("a");

        assert!(batch.keep(&a));
        assert!(!batch.mark_deleted(&a));
        assert!(!batch.keep(&a));
        assert_eq!(batch.disposition(&a), Some(Disposition::Kept));

        assert!(!batch.mark_deleted(&ImageId::new("unknown")));
    }

    #[test]
    fn keep_remaining_settles_batch() {
        let mut batch = DeletionBatch::new(ids(&["a", "b", "c"]));
        batch.mark_deleted(&ImageId::new("b"));
        assert_eq!(batch.keep_remaining(), ids(&["a", "c"]));
        assert!(batch.is_settled());
        assert_eq!(batch.deleted(), ids(&["b"]));
        assert_eq!(batch.kept(), ids(&["a", "c"]));
    }
}
