//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Entry       │   │     Batch       │   │  BatchHeader    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (u64)       │◄──│  entries        │   │  date           │       │
//! │  │  barcode        │   │  header ────────┼──►│  store          │       │
//! │  │  quantity       │   │  (snapshot)     │   │  discount (%)   │       │
//! │  │  price (Money)  │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │    ScanMode     │   1d → linear decoder                              │
//! │  │  1d | 2d | all  │   2d → matrix decoder                              │
//! │  └─────────────────┘   all → both, concurrently                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The serde shapes here are the persisted shapes: `entries` and `batches`
//! in storage are JSON arrays of these types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::DEFAULT_DISCOUNT;

/// Entry identifier, assigned monotonically by the entry list.
pub type EntryId = u64;

// =============================================================================
// Entry
// =============================================================================

/// One line item of the current list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique, strictly increasing id.
    pub id: EntryId,

    /// Decoded or typed barcode text (compared case-sensitively).
    pub barcode: String,

    /// Always ≥ 1.
    pub quantity: i64,

    /// Unit price, ≥ 0. Zero for scanned entries.
    pub price: Money,
}

impl Entry {
    /// Returns the line total (price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price.line_total(self.quantity)
    }
}

// =============================================================================
// Batch Header
// =============================================================================

/// Header metadata captured when a batch is finalized.
///
/// The values come from the configuration surface at finalize time and are
/// copied into the batch; later header edits do not touch saved batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchHeader {
    pub date: String,
    pub store: String,
    /// Numeric percentage as text, e.g. `"10"`.
    pub discount: String,
}

impl BatchHeader {
    pub fn new(
        date: impl Into<String>,
        store: impl Into<String>,
        discount: impl Into<String>,
    ) -> Self {
        BatchHeader {
            date: date.into(),
            store: store.into(),
            discount: discount.into(),
        }
    }

    /// Discount with its percent suffix, as rendered and exported.
    pub fn discount_label(&self) -> String {
        format!("{}%", self.discount)
    }
}

impl Default for BatchHeader {
    fn default() -> Self {
        BatchHeader::new("", "", DEFAULT_DISCOUNT)
    }
}

// =============================================================================
// Batch
// =============================================================================

/// A finalized, immutable snapshot of entries plus header metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub header: BatchHeader,
    pub entries: Vec<Entry>,
}

impl Batch {
    /// Sum of all entry quantities.
    pub fn total_quantity(&self) -> i64 {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    /// Sum of all line totals.
    pub fn total_value(&self) -> Money {
        self.entries.iter().map(Entry::line_total).sum()
    }
}

// =============================================================================
// Scan Mode
// =============================================================================

/// Which decoding engine(s) run during capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanMode {
    /// Linear symbologies only (code-128, EAN, UPC).
    #[serde(rename = "1d")]
    Linear,

    /// Matrix symbologies only (QR, Data Matrix, ...).
    #[serde(rename = "2d")]
    Matrix,

    /// Both decoders against the same source.
    #[default]
    #[serde(rename = "all")]
    All,
}

impl ScanMode {
    /// All modes in display order.
    pub const ALL_MODES: [ScanMode; 3] = [ScanMode::Linear, ScanMode::Matrix, ScanMode::All];

    /// Returns the persisted text form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Linear => "1d",
            ScanMode::Matrix => "2d",
            ScanMode::All => "all",
        }
    }

    /// Returns true if the linear decoder runs in this mode.
    pub fn runs_linear(&self) -> bool {
        matches!(self, ScanMode::Linear | ScanMode::All)
    }

    /// Returns true if the matrix decoder runs in this mode.
    pub fn runs_matrix(&self) -> bool {
        matches!(self, ScanMode::Matrix | ScanMode::All)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(ScanMode::Linear),
            "2d" => Ok(ScanMode::Matrix),
            "all" => Ok(ScanMode::All),
            _ => Err(ValidationError::NotAllowed {
                field: "scan mode".to_string(),
                allowed: ScanMode::ALL_MODES
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
