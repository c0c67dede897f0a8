//! # Entry Store
//!
//! The current (unsaved) entry list.
//!
//! ## Scan Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       record_scan("A1")                                 │
//! │                                                                         │
//! │   entries: [A1×1, B2×1]                                                 │
//! │                │                                                        │
//! │                ▼                                                        │
//! │   first entry with barcode == "A1"?                                     │
//! │        │ yes                          │ no                              │
//! │        ▼                              ▼                                 │
//! │   quantity += 1                  push {id: next_id, qty 1, price 0}    │
//! │   ScanOutcome::Incremented       ScanOutcome::Added                     │
//! │                                                                         │
//! │   The caller persists the list afterwards, every time.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Id Sequence
//! Ids come from a counter that only moves forward. Clearing the list or
//! finalizing it into a batch never rewinds the counter, so an id is never
//! handed out twice for the lifetime of the store.

use crate::capability::Confirm;
use crate::money::Money;
use crate::types::{Entry, EntryId};
use crate::validation::{normalize_price, normalize_quantity, validate_barcode};
use crate::{DEFAULT_QUANTITY, FIRST_ENTRY_ID};

/// Prompt shown before the whole list is cleared.
pub const CLEAR_PROMPT: &str = "Clear all entries?";

/// What a scan did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A new entry was appended.
    Added { id: EntryId },

    /// An existing entry's quantity went up by one.
    Incremented { id: EntryId, quantity: i64 },
}

impl ScanOutcome {
    /// Id of the entry the scan touched.
    pub fn id(&self) -> EntryId {
        match self {
            ScanOutcome::Added { id } | ScanOutcome::Incremented { id, .. } => *id,
        }
    }
}

/// In-memory ordered list of line items for the batch being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStore {
    entries: Vec<Entry>,
    next_id: EntryId,
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        EntryStore {
            entries: Vec::new(),
            next_id: FIRST_ENTRY_ID,
        }
    }

    /// Rebuilds a store from persisted state.
    ///
    /// The id counter resumes at the largest of the stored counter, one past
    /// the highest loaded id, and [`FIRST_ENTRY_ID`].
    pub fn from_parts(entries: Vec<Entry>, stored_next_id: Option<EntryId>) -> Self {
        let past_max = entries
            .iter()
            .map(|e| e.id.saturating_add(1))
            .max()
            .unwrap_or(FIRST_ENTRY_ID);

        let next_id = stored_next_id
            .unwrap_or(FIRST_ENTRY_ID)
            .max(past_max)
            .max(FIRST_ENTRY_ID);

        EntryStore { entries, next_id }
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Records one decoded code.
    ///
    /// Matching is exact and case-sensitive against the first entry with the
    /// same barcode. Any text is accepted, including text a manual add would
    /// reject.
    pub fn record_scan(&mut self, code: &str) -> ScanOutcome {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.barcode == code) {
            entry.quantity += 1;
            return ScanOutcome::Incremented {
                id: entry.id,
                quantity: entry.quantity,
            };
        }

        let id = self.allocate_id();
        self.entries.push(Entry {
            id,
            barcode: code.to_string(),
            quantity: DEFAULT_QUANTITY,
            price: Money::zero(),
        });
        ScanOutcome::Added { id }
    }

    /// Appends a manually entered item.
    ///
    /// Returns `None` (and changes nothing) when the barcode is blank.
    /// Manual adds always append, even when the barcode is already listed.
    pub fn add_manual(
        &mut self,
        barcode: &str,
        quantity: Option<i64>,
        price: Option<Money>,
    ) -> Option<&Entry> {
        let barcode = validate_barcode(barcode).ok()?.to_string();

        let id = self.allocate_id();
        self.entries.push(Entry {
            id,
            barcode,
            quantity: normalize_quantity(quantity.unwrap_or(DEFAULT_QUANTITY)),
            price: normalize_price(price.unwrap_or_default()),
        });
        self.entries.last()
    }

    /// Empties the list after confirmation.
    ///
    /// Returns `true` if the list was cleared. Declining leaves it untouched.
    pub fn clear(&mut self, confirm: &mut dyn Confirm) -> bool {
        if !confirm.confirm(CLEAR_PROMPT) {
            return false;
        }
        self.entries.clear();
        true
    }

    /// Moves every entry out, leaving the list empty.
    pub(crate) fn take(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.entries)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current entries in insertion order.
    pub fn list(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id the next new entry will get.
    pub fn next_id(&self) -> EntryId {
        self.next_id
    }

    /// Sum of quantities across the list.
    pub fn total_quantity(&self) -> i64 {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    /// Sum of line totals across the list.
    pub fn total_value(&self) -> Money {
        self.entries.iter().map(Entry::line_total).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
