//! # Renderer
//!
//! Pure projection of the two stores into display rows. Nothing here is
//! cached: rows (and the batch indices bound to their actions) are rebuilt
//! from store contents on every call, so a row rendered before a deletion
//! must be rendered again before its actions are trusted.

use std::fmt;

use crate::types::{Batch, Entry, EntryId};

/// One line of the current entry list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub id: EntryId,
    pub text: String,
}

/// An action offered next to a batch row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    Export { index: usize },
    Delete { index: usize },
}

/// One line of the batch list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    /// 1-based position as shown to the user.
    pub ordinal: usize,
    pub text: String,
    pub actions: [BatchAction; 2],
}

impl BatchRow {
    /// 0-based index the actions are bound to.
    pub fn index(&self) -> usize {
        self.ordinal - 1
    }
}

impl fmt::Display for EntryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Display for BatchRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// `"{barcode} | Qty: {quantity} | Price: {price}"`
pub fn entry_row(entry: &Entry) -> EntryRow {
    EntryRow {
        id: entry.id,
        text: format!(
            "{} | Qty: {} | Price: {}",
            entry.barcode, entry.quantity, entry.price
        ),
    }
}

/// `"Batch {n} - {date} - {store} - Discount: {discount}% - Total Qty: {total}"`
pub fn batch_row(index: usize, batch: &Batch) -> BatchRow {
    let ordinal = index + 1;
    BatchRow {
        ordinal,
        text: format!(
            "Batch {} - {} - {} - Discount: {} - Total Qty: {}",
            ordinal,
            batch.header.date,
            batch.header.store,
            batch.header.discount_label(),
            batch.total_quantity()
        ),
        actions: [BatchAction::Export { index }, BatchAction::Delete { index }],
    }
}

pub fn render_entries(entries: &[Entry]) -> Vec<EntryRow> {
    entries.iter().map(entry_row).collect()
}

pub fn render_batches(batches: &[Batch]) -> Vec<BatchRow> {
    batches
        .iter()
        .enumerate()
        .map(|(index, batch)| batch_row(index, batch))
        .collect()
}
