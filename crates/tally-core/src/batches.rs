//! # Batch Store
//!
//! Finalized batches, in creation order.
//!
//! ## Finalize
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EntryStore [A1×2, B2×1]        BatchStore [Batch 1]                    │
//! │          │                                                              │
//! │          │ finalize(header)                                             │
//! │          ▼                                                              │
//! │  EntryStore []                  BatchStore [Batch 1, Batch 2]           │
//! │                                              └── header snapshot        │
//! │                                              └── [A1×2, B2×1]           │
//! │                                                                         │
//! │  Empty EntryStore → CoreError::NothingToFinalize, nothing moves.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Batches are never edited. The only mutation after creation is deleting a
//! whole batch by position.

use crate::capability::Confirm;
use crate::entries::EntryStore;
use crate::error::{CoreError, CoreResult};
use crate::types::{Batch, BatchHeader};

/// Prompt shown before a batch is deleted.
pub const DELETE_PROMPT: &str = "Delete this batch?";

/// In-memory ordered list of finalized batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStore {
    batches: Vec<Batch>,
}

impl From<Vec<Batch>> for BatchStore {
    fn from(batches: Vec<Batch>) -> Self {
        BatchStore { batches }
    }
}

impl BatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves every current entry into a new batch carrying `header`.
    ///
    /// ## Errors
    /// [`CoreError::NothingToFinalize`] if `entries` is empty; neither store
    /// changes in that case.
    pub fn finalize(
        &mut self,
        header: BatchHeader,
        entries: &mut EntryStore,
    ) -> CoreResult<&Batch> {
        if entries.is_empty() {
            return Err(CoreError::NothingToFinalize);
        }

        self.batches.push(Batch {
            header,
            entries: entries.take(),
        });

        // Just pushed, so never empty here.
        self.batches.last().ok_or(CoreError::NothingToFinalize)
    }

    /// Removes the batch at the 0-based `index` after confirmation.
    ///
    /// Returns `Ok(None)` when the confirmation was declined.
    ///
    /// ## Errors
    /// [`CoreError::BatchNotFound`] for an out-of-range index, checked before
    /// asking.
    pub fn remove(
        &mut self,
        index: usize,
        confirm: &mut dyn Confirm,
    ) -> CoreResult<Option<Batch>> {
        if index >= self.batches.len() {
            return Err(CoreError::batch_not_found(index, self.batches.len()));
        }

        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(None);
        }

        Ok(Some(self.batches.remove(index)))
    }

    /// Batch at the 0-based `index`.
    pub fn get(&self, index: usize) -> CoreResult<&Batch> {
        self.batches
            .get(index)
            .ok_or_else(|| CoreError::batch_not_found(index, self.batches.len()))
    }

    pub fn list(&self) -> &[Batch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
