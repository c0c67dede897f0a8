//! # Validation Module
//!
//! Input parsing and validation for manual entry and batch header fields.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI (clap)                                                   │
//! │  └── Argument shape                                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lenient numeric parsing (manual quantity / price)                 │
//! │  └── Header field rules (date, store, discount)                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Stores                                                       │
//! │  └── Invariants (quantity ≥ 1, price ≥ 0, unique ids)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decoded scan text is never validated: any decoded text is a barcode.
//!
//! ## Lenient Numbers
//! Manual quantity and price fields behave like typed form inputs: the
//! leading number is taken (`"3 boxes"` → 3), and anything that is absent,
//! non-numeric or out of domain falls back to the default (quantity 1,
//! price 0).
//!
//! ```rust
//! use tally_core::validation::{parse_price_input, parse_quantity_input};
//!
//! assert_eq!(parse_quantity_input(Some("3 boxes")), 3);
//! assert_eq!(parse_quantity_input(Some("abc")), 1);
//! assert_eq!(parse_price_input(Some("2.5")).cents(), 250);
//! assert_eq!(parse_price_input(None).cents(), 0);
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{DEFAULT_DISCOUNT, DEFAULT_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Date format for batch headers.
pub const BATCH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Maximum store name length.
pub const MAX_STORE_NAME_LEN: usize = 100;

// =============================================================================
// Barcode
// =============================================================================

/// Validates a manually typed barcode and returns it trimmed.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_barcode;
///
/// assert_eq!(validate_barcode("  4006381333931 ").unwrap(), "4006381333931");
/// assert!(validate_barcode("   ").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<&str> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    Ok(barcode)
}

// =============================================================================
// Lenient Numeric Parsing
// =============================================================================

/// Returns the leading numeric prefix of `input` (after leading whitespace).
///
/// Accepts an optional sign, digits, and (when `fraction` is set) one decimal
/// point followed by more digits.
fn leading_number(input: &str, fraction: bool) -> Option<&str> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;

    if fraction && end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            has_digits = true;
            end = frac_end;
        } else if has_digits {
            end = frac_start;
        }
    }

    has_digits.then(|| &s[..end])
}

/// Parses a manual quantity field.
///
/// Absent, non-numeric, zero and negative input all yield the default of 1.
pub fn parse_quantity_input(input: Option<&str>) -> i64 {
    input
        .and_then(|raw| leading_number(raw, false))
        .and_then(|n| n.parse::<i64>().ok())
        .map(normalize_quantity)
        .unwrap_or(DEFAULT_QUANTITY)
}

/// Parses a manual price field.
///
/// Absent, non-numeric and negative input all yield zero.
pub fn parse_price_input(input: Option<&str>) -> Money {
    input
        .and_then(|raw| leading_number(raw, true))
        .and_then(|n| n.parse::<f64>().ok())
        .map(|v| normalize_price(Money::from_major(v)))
        .unwrap_or_default()
}

/// Clamps a quantity into the entry domain (≥ 1).
#[inline]
pub fn normalize_quantity(qty: i64) -> i64 {
    if qty < 1 {
        DEFAULT_QUANTITY
    } else {
        qty
    }
}

/// Clamps a price into the entry domain (≥ 0).
#[inline]
pub fn normalize_price(price: Money) -> Money {
    if price.is_negative() {
        Money::zero()
    } else {
        price
    }
}

// =============================================================================
// Batch Header Fields
// =============================================================================

/// Validates a batch date: empty, or a calendar date in `YYYY-MM-DD`.
pub fn validate_batch_date(date: &str) -> ValidationResult<String> {
    let date = date.trim();

    if date.is_empty() {
        return Ok(String::new());
    }

    NaiveDate::parse_from_str(date, BATCH_DATE_FORMAT).map_err(|e| {
        ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: format!("expected YYYY-MM-DD ({})", e),
        }
    })?;

    Ok(date.to_string())
}

/// Validates a store name.
pub fn validate_store_name(store: &str) -> ValidationResult<String> {
    let store = store.trim();

    if store.chars().count() > MAX_STORE_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "store".to_string(),
            max: MAX_STORE_NAME_LEN,
        });
    }

    Ok(store.to_string())
}

/// Validates a discount percentage kept as text.
///
/// ## Rules
/// - Empty means no discount (`"0"`)
/// - Must parse as a number between 0 and 100
/// - The trimmed text is kept as typed (`"12.5"` stays `"12.5"`)
pub fn validate_discount(discount: &str) -> ValidationResult<String> {
    let discount = discount.trim();

    if discount.is_empty() {
        return Ok(DEFAULT_DISCOUNT.to_string());
    }

    let value: f64 = discount
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: "discount".to_string(),
            reason: "must be a number".to_string(),
        })?;

    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(discount.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
