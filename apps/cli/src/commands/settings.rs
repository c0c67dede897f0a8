//! # Settings Commands
//!
//! The batch header fields and the scan mode live in storage next to the
//! stores; these commands are the only writers of those keys.

use std::io::Write;

use clap::Args;
use tally_core::validation::{
    validate_batch_date, validate_discount, validate_store_name, BATCH_DATE_FORMAT,
};
use tally_core::{BatchHeader, ScanMode};
use tally_db::StorageRepository;
use tracing::info;

use crate::error::CliResult;

/// Header fields to change. Fields left out keep their stored value.
#[derive(Debug, Clone, Default, Args)]
pub struct HeaderUpdate {
    /// Batch date, YYYY-MM-DD (empty to clear)
    #[arg(long, conflicts_with = "today")]
    pub date: Option<String>,

    /// Store name
    #[arg(long)]
    pub store: Option<String>,

    /// Discount percentage, 0-100
    #[arg(long)]
    pub discount: Option<String>,

    /// Set the date to today
    #[arg(long)]
    pub today: bool,
}

impl HeaderUpdate {
    fn is_empty(&self) -> bool {
        self.date.is_none() && self.store.is_none() && self.discount.is_none() && !self.today
    }

    /// Validates every given field, then applies them to `header`.
    ///
    /// Nothing is applied if any field is invalid.
    pub fn apply(&self, header: &BatchHeader, today: &str) -> CliResult<BatchHeader> {
        let date = match (&self.date, self.today) {
            (_, true) => Some(today.to_string()),
            (Some(date), false) => Some(validate_batch_date(date)?),
            (None, false) => None,
        };
        let store = self.store.as_deref().map(validate_store_name).transpose()?;
        let discount = self.discount.as_deref().map(validate_discount).transpose()?;

        Ok(BatchHeader::new(
            date.unwrap_or_else(|| header.date.clone()),
            store.unwrap_or_else(|| header.store.clone()),
            discount.unwrap_or_else(|| header.discount.clone()),
        ))
    }
}

fn write_header(out: &mut dyn Write, header: &BatchHeader) -> CliResult<()> {
    writeln!(out, "Date: {}", header.date)?;
    writeln!(out, "Store: {}", header.store)?;
    writeln!(out, "Discount: {}", header.discount_label())?;
    Ok(())
}

/// Shows the header the next finalize will use, updating it first if any
/// field was given.
pub async fn header(
    storage: &StorageRepository,
    out: &mut dyn Write,
    update: &HeaderUpdate,
) -> CliResult<()> {
    let mut current = storage.load_header().await?;

    if !update.is_empty() {
        let today = chrono::Local::now().format(BATCH_DATE_FORMAT).to_string();
        current = update.apply(&current, &today)?;
        storage.save_header(&current).await?;
        info!(date = %current.date, store = %current.store, discount = %current.discount, "Batch header updated");
    }

    write_header(out, &current)
}

/// Shows the stored scan mode, or stores a new one.
pub async fn mode(
    storage: &StorageRepository,
    out: &mut dyn Write,
    mode: Option<&str>,
) -> CliResult<()> {
    match mode {
        Some(raw) => {
            let mode: ScanMode = raw.trim().parse()?;
            storage.save_scan_mode(mode).await?;
            writeln!(out, "Scan mode: {}", mode)?;
        }
        None => {
            writeln!(out, "Scan mode: {}", storage.load_scan_mode().await?)?;
        }
    }
    Ok(())
}
