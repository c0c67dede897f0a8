//! # Interactive Shell
//!
//! Live capture plus typed commands in one loop. Standard input carries the
//! commands, so it is never used as a capture device here.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  loop select! {                                                         │
//! │      detection ──► record_scan ──► bell                                 │
//! │      input line ─┬─ pending confirmation? ──► answer (y/N)              │
//! │                  └─ command ──► entries / batches / export / capture    │
//! │  }                                                                      │
//! │                                                                         │
//! │  clear, delete <n>:  prompt ──► next line is the answer                 │
//! │                      (detections keep being recorded meanwhile)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Write;

use tally_capture::{Detection, MediaDevices};
use tally_core::batches::DELETE_PROMPT;
use tally_core::entries::CLEAR_PROMPT;
use tally_core::{Feedback, FixedAnswer, ScanMode};
use tally_export::XlsxSheetWriter;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::commands::{batches, capture, entries, export, ordinal_index, settings};
use crate::error::{CliError, CliResult};
use crate::state::{CaptureState, Session};
use crate::terminal::is_yes;

const HELP: &str = "\
Commands:
  scan <code>                 record a code as if scanned
  add <barcode> [qty] [price] add an entry by hand
  list                        show current entries
  clear                       clear current entries
  next                        save current entries as a new batch
  batches                     show saved batches
  export <n>                  export batch n to batch_<n>.xlsx
  delete <n>                  delete batch n
  download                    export current entries to entries.xlsx
  mode [1d|2d|all]            show or switch the scan mode
  camera                      switch to the next capture device
  start | stop                start or stop capture
  help                        show this help
  quit                        leave the shell";

/// A destructive command waiting for its y/n answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Clear,
    DeleteBatch(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Capture half of the shell; absent when no device is configured.
pub struct ShellCapture<M: MediaDevices> {
    pub state: CaptureState<M>,
    pub detections: mpsc::UnboundedReceiver<Detection>,
}

pub struct Shell<'a, M: MediaDevices> {
    session: &'a mut Session,
    capture: Option<ShellCapture<M>>,
    writer: XlsxSheetWriter,
    feedback: &'a mut dyn Feedback,
    pending: Option<Pending>,
}

async fn next_detection<M: MediaDevices>(capture: &mut Option<ShellCapture<M>>) -> Option<Detection> {
    match capture {
        Some(capture) => capture.detections.recv().await,
        None => std::future::pending().await,
    }
}

impl<'a, M: MediaDevices> Shell<'a, M> {
    pub fn new(
        session: &'a mut Session,
        capture: Option<ShellCapture<M>>,
        writer: XlsxSheetWriter,
        feedback: &'a mut dyn Feedback,
    ) -> Self {
        Shell {
            session,
            capture,
            writer,
            feedback,
            pending: None,
        }
    }

    /// Runs until `quit` or end of input.
    pub async fn run<R>(&mut self, input: R, out: &mut dyn Write) -> CliResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        if self.capture.is_some() {
            let started = self.start_capture().await;
            self.report(started, out)?;
        } else {
            writeln!(out, "No capture devices configured; use `scan <code>` to record codes.")?;
        }
        writeln!(out, "Type `help` for commands.")?;

        loop {
            tokio::select! {
                Some(detection) = next_detection(&mut self.capture) => {
                    let result = capture::record_detection(self.session, self.feedback, &detection).await;
                    self.report(result, out)?;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("Shell input closed");
                        break;
                    };
                    if self.handle_line(&line, out).await? == Flow::Quit {
                        break;
                    }
                }
            }
        }

        if let Some(capture) = &mut self.capture {
            capture.state.stop();
        }
        info!("Shell closed");
        Ok(())
    }

    /// Prints a command failure as a notice; only output failures escape.
    fn report(&mut self, result: CliResult<()>, out: &mut dyn Write) -> CliResult<()> {
        if let Err(e) = result {
            self.feedback.alert(&e.message);
        }
        out.flush()?;
        Ok(())
    }

    async fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> CliResult<Flow> {
        if let Some(pending) = self.pending.take() {
            let result = self.answer(pending, is_yes(line), out).await;
            self.report(result, out)?;
            return Ok(Flow::Continue);
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        if matches!(command, "quit" | "exit") {
            return Ok(Flow::Quit);
        }

        let result = self.dispatch(command, rest, out).await;
        self.report(result, out)?;
        Ok(Flow::Continue)
    }

    async fn dispatch(&mut self, command: &str, rest: &str, out: &mut dyn Write) -> CliResult<()> {
        match command {
            "help" => writeln!(out, "{}", HELP)?,
            "scan" => {
                entries::scan_typed(self.session, self.feedback, rest).await?;
            }
            "add" => {
                let mut args = rest.split_whitespace();
                let barcode = args.next().unwrap_or("");
                let quantity = args.next();
                let price = args.next();
                entries::add(self.session, out, barcode, quantity, price).await?;
            }
            "list" => entries::list(self.session, out)?,
            "clear" => self.ask(Pending::Clear, CLEAR_PROMPT, out)?,
            "next" => batches::finalize(self.session, out).await?,
            "batches" => batches::list_batches(self.session, out)?,
            "export" => {
                let ordinal = parse_ordinal(rest)?;
                export::export_batch(self.session, &mut self.writer, out, ordinal)?;
            }
            "delete" => {
                let ordinal = parse_ordinal(rest)?;
                let index = ordinal_index(ordinal, self.session.batches().len())?;
                self.session.batch(index)?;
                self.ask(Pending::DeleteBatch(ordinal), DELETE_PROMPT, out)?;
            }
            "download" => export::export_current(self.session, &mut self.writer, out)?,
            "mode" => self.mode(rest, out).await?,
            "camera" => {
                let capture = self.capture_mut()?;
                capture.state.toggle_camera().await?;
                let device = capture.state.controller().active_device().unwrap_or("-").to_string();
                writeln!(out, "Capturing from {}", device)?;
            }
            "start" => self.start_capture().await?,
            "stop" => {
                self.capture_mut()?.state.stop();
                writeln!(out, "Capture stopped.")?;
            }
            other => {
                return Err(CliError::validation(format!(
                    "Unknown command '{}'; type `help`",
                    other
                )))
            }
        }
        Ok(())
    }

    fn ask(&mut self, pending: Pending, prompt: &str, out: &mut dyn Write) -> CliResult<()> {
        writeln!(out, "{} [y/N]", prompt)?;
        self.pending = Some(pending);
        Ok(())
    }

    async fn answer(&mut self, pending: Pending, yes: bool, out: &mut dyn Write) -> CliResult<()> {
        let mut confirm = FixedAnswer(yes);
        match pending {
            Pending::Clear => entries::clear(self.session, out, &mut confirm).await,
            Pending::DeleteBatch(ordinal) => {
                batches::delete(self.session, out, ordinal, &mut confirm).await
            }
        }
    }

    async fn mode(&mut self, rest: &str, out: &mut dyn Write) -> CliResult<()> {
        if rest.is_empty() {
            return settings::mode(self.session.storage(), out, None).await;
        }

        let mode: ScanMode = rest.parse()?;
        match &mut self.capture {
            Some(capture) => capture.state.switch_mode(mode).await?,
            None => self.session.storage().save_scan_mode(mode).await?,
        }
        writeln!(out, "Scan mode: {}", mode)?;
        Ok(())
    }

    async fn start_capture(&mut self) -> CliResult<()> {
        let capture = self.capture_mut()?;
        capture.state.start().await?;
        let controller = capture.state.controller();
        info!(mode = %controller.mode(), device = ?controller.active_device(), "Shell capture started");
        Ok(())
    }

    fn capture_mut(&mut self) -> CliResult<&mut ShellCapture<M>> {
        self.capture
            .as_mut()
            .ok_or_else(|| CliError::validation("No capture devices configured"))
    }
}

fn parse_ordinal(raw: &str) -> CliResult<usize> {
    raw.parse()
        .map_err(|_| CliError::validation(format!("Expected a batch number, got '{}'", raw)))
}
