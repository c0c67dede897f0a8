//! # Commands
//!
//! One function per user operation. Each takes the state it needs and a
//! writer for its output, so the one-shot subcommands and the shell share
//! the same code.
//!
//! ```text
//! entries.rs   scan, add, list, clear
//! batches.rs   finalize, list_batches, delete
//! export.rs    export_batch, export_current
//! settings.rs  header, mode
//! capture.rs   live capture loop
//! shell.rs     interactive shell over capture + commands
//! ```

pub mod batches;
pub mod capture;
pub mod entries;
pub mod export;
pub mod settings;
pub mod shell;

use tally_core::{CoreError, CoreResult};

/// Converts a 1-based batch ordinal as rendered into a store index.
///
/// Only `0` is rejected here; the store checks the upper bound.
pub fn ordinal_index(ordinal: usize, count: usize) -> CoreResult<usize> {
    ordinal
        .checked_sub(1)
        .ok_or(CoreError::BatchNotFound { ordinal, count })
}
