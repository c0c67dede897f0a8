//! # Capabilities
//!
//! Narrow interfaces for the side effects the intake flow needs from its
//! host: a yes/no gate before destructive operations, and user feedback
//! after scans and guard failures.
//!
//! ```text
//! ┌────────────────────────┐        ┌──────────────────────────────────┐
//! │  EntryStore::clear     │──ask──►│ Confirm  (terminal prompt,       │
//! │  BatchStore::remove    │        │           FixedAnswer in tests)  │
//! └────────────────────────┘        └──────────────────────────────────┘
//! ┌────────────────────────┐        ┌──────────────────────────────────┐
//! │  session (outer layer) │──tell─►│ Feedback (bell + message)        │
//! └────────────────────────┘        └──────────────────────────────────┘
//! ```

/// Explicit yes/no confirmation for destructive operations.
pub trait Confirm {
    /// Asks the question; `true` means proceed.
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// A confirmation with a predetermined answer.
///
/// Used for `--yes` on the command line, for the shell's in-band answers,
/// and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// User-visible feedback.
pub trait Feedback {
    /// A code was recorded (the "beep").
    fn success(&mut self, code: &str);

    /// A blocking notice, e.g. "No entries to save!".
    fn alert(&mut self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_answer() {
        assert!(FixedAnswer(true).confirm("Clear all entries?"));
        assert!(!FixedAnswer(false).confirm("Clear all entries?"));
    }

    #[test]
    fn test_closure_confirm_sees_prompt() {
        let mut seen = Vec::new();
        let mut gate = |prompt: &str| {
            seen.push(prompt.to_string());
            false
        };
        assert!(!gate.confirm("Delete this batch?"));
        assert_eq!(seen, vec!["Delete this batch?".to_string()]);
    }
}
