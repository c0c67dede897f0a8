//! # State Module
//!
//! Two focused state types instead of one application struct:
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────────┐
//! │  Session                     │   │  CaptureState                    │
//! │                              │   │                                  │
//! │  • EntryStore                │   │  • CaptureController             │
//! │  • BatchStore                │   │  • scanMode persistence          │
//! │  • storage writes            │   │                                  │
//! └──────────────────────────────┘   └──────────────────────────────────┘
//! ```
//!
//! One-shot commands only need a `Session`. The capture loop and the shell
//! hold both; detections flow from `CaptureState` into `Session`.

mod capture;
mod session;

pub use capture::CaptureState;
pub use session::Session;
