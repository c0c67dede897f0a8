//! # Entry Commands
//!
//! ```text
//! scan <code>         ──► record_scan (exact match increments, else append)
//! add <barcode> ...   ──► add_manual  (always appends)
//! list                ──► render_entries
//! clear               ──► confirm ──► empty list (ids keep counting)
//! ```

use std::io::Write;

use tally_core::render::{entry_row, render_entries};
use tally_core::validation::{parse_price_input, parse_quantity_input};
use tally_core::{Confirm, Feedback, ScanOutcome, ValidationError};

use crate::error::CliResult;
use crate::state::Session;

/// Records one decoded code and signals success.
pub async fn scan(
    session: &mut Session,
    feedback: &mut dyn Feedback,
    code: &str,
) -> CliResult<ScanOutcome> {
    let outcome = session.record_scan(code).await?;
    feedback.success(code);
    Ok(outcome)
}

/// Records a code typed at the prompt. Unlike decoder output, an empty
/// code is refused.
pub async fn scan_typed(
    session: &mut Session,
    feedback: &mut dyn Feedback,
    code: &str,
) -> CliResult<ScanOutcome> {
    if code.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "Barcode".to_string(),
        }
        .into());
    }
    scan(session, feedback, code).await
}

/// Adds a manual entry from raw quantity and price text.
///
/// Unparseable or out-of-range quantity and price fall back to 1 and 0.
pub async fn add(
    session: &mut Session,
    out: &mut dyn Write,
    barcode: &str,
    quantity: Option<&str>,
    price: Option<&str>,
) -> CliResult<()> {
    let quantity = parse_quantity_input(quantity);
    let price = parse_price_input(price);

    let Some(entry) = session.add_manual(barcode, Some(quantity), Some(price)).await? else {
        return Err(ValidationError::Required {
            field: "Barcode".to_string(),
        }
        .into());
    };

    writeln!(out, "{}", entry_row(&entry))?;
    Ok(())
}

pub fn list(session: &Session, out: &mut dyn Write) -> CliResult<()> {
    let entries = session.entries();
    if entries.is_empty() {
        writeln!(out, "No entries.")?;
        return Ok(());
    }

    for row in render_entries(entries.list()) {
        writeln!(out, "{}", row)?;
    }
    writeln!(
        out,
        "{} entries - Total Qty: {} - Total: {}",
        entries.len(),
        entries.total_quantity(),
        entries.total_value()
    )?;
    Ok(())
}

pub async fn clear(
    session: &mut Session,
    out: &mut dyn Write,
    confirm: &mut dyn Confirm,
) -> CliResult<()> {
    if session.clear(confirm).await? {
        writeln!(out, "Entries cleared.")?;
    } else {
        writeln!(out, "Cancelled.")?;
    }
    Ok(())
}
