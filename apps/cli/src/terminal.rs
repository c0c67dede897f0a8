//! # Terminal Capabilities
//!
//! Terminal-backed implementations of the confirmation and feedback
//! capabilities used by one-shot commands and the capture loop.

use std::io::{self, BufRead, Write};

use tally_core::{Confirm, Feedback};
use tracing::debug;

/// Terminal bell.
const BELL: &str = "\x07";

/// Whether an answer line means "yes".
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Asks on stderr and reads one line from stdin. Anything but `y`/`yes`
/// declines, including end of input.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        let mut stderr = io::stderr();
        if write!(stderr, "{} [y/N] ", prompt).and_then(|_| stderr.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                debug!(error = %e, "Confirmation read failed");
                false
            }
        }
    }
}

/// Prints scan feedback and alerts to the terminal.
///
/// Recorded codes go to stdout, optionally with a bell; alerts go to stderr.
#[derive(Debug, Clone, Copy)]
pub struct TerminalNotifier {
    bell: bool,
}

impl TerminalNotifier {
    pub fn new(bell: bool) -> Self {
        TerminalNotifier { bell }
    }
}

impl Feedback for TerminalNotifier {
    fn success(&mut self, code: &str) {
        let bell = if self.bell { BELL } else { "" };
        println!("{}Scanned: {}", bell, code);
    }

    fn alert(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES \n"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
