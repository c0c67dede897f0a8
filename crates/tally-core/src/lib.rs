//! # tally-core
//!
//! Bookkeeping for barcode intake: the current entry list, the finalized
//! batches, and how both are shown and exported. Nothing here touches a
//! file, a database, or a device.
//!
//! ```text
//!   decoded text ──► EntryStore ──finalize──► BatchStore
//!   (scan / manual)   current list            saved batches
//!                         │                        │
//!                         └────────┬───────────────┘
//!                                  ▼
//!                    render (rows)   export (Sheet ──► SheetWriter)
//! ```
//!
//! Destructive steps ask through [`Confirm`]; scan results are reported
//! through [`Feedback`]. Callers supply both.
//!
//! ```rust
//! use tally_core::entries::EntryStore;
//!
//! let mut store = EntryStore::new();
//! store.record_scan("A1");
//! store.record_scan("A1");
//! store.record_scan("B2");
//!
//! assert_eq!(store.len(), 2);
//! assert_eq!(store.list()[0].quantity, 2);
//! ```

pub mod batches;
pub mod capability;
pub mod entries;
pub mod error;
pub mod export;
pub mod money;
pub mod render;
pub mod types;
pub mod validation;

pub use batches::BatchStore;
pub use capability::{Confirm, Feedback, FixedAnswer};
pub use entries::{EntryStore, ScanOutcome};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Id given to the first entry of a fresh list.
pub const FIRST_ENTRY_ID: EntryId = 1;

/// Header discount when none is set.
pub const DEFAULT_DISCOUNT: &str = "0";

/// Quantity for manual input that is absent or not a positive integer.
pub const DEFAULT_QUANTITY: i64 = 1;
