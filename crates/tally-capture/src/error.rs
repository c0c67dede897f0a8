//! # Capture Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Devices      │  │    Tasks        │  │     Guards              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  DeviceUnavail. │  │  NoRuntime      │  │  NoSecondaryCamera      │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Device failures surface to the user as-is; capture is not retried.

use thiserror::Error;

/// Result type alias for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum CaptureError {
    // =========================================================================
    // Device Errors
    // =========================================================================
    /// Opening a stream on a device failed (missing, permission, busy).
    #[error("Capture device '{device}' unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    // =========================================================================
    // Task Errors
    // =========================================================================
    /// A reader or decoder task was started outside an async runtime.
    #[error("Capture requires a running async runtime")]
    NoRuntime,

    // =========================================================================
    // Guards
    // =========================================================================
    /// Toggle requested with at most one enumerated device.
    #[error("No secondary camera found!")]
    NoSecondaryCamera,
}

impl CaptureError {
    pub fn unavailable(device: impl Into<String>, reason: impl ToString) -> Self {
        CaptureError::DeviceUnavailable {
            device: device.into(),
            reason: reason.to_string(),
        }
    }
}
