//! # tally-capture: Capture Layer for Tally
//!
//! Device enumeration, stream lifecycle and the two decoding engines.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  scanner ──line──► MediaTrack ──Frame──► FrameHub ──┬─► LinearDecoder   │
//! │  (hardware                                           └─► MatrixDecoder  │
//! │   decoded)                                                   │          │
//! │                                                    Detection │          │
//! │                                                              ▼          │
//! │                                   mpsc ──► session loop ──► record_scan │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`controller`] - Start/stop/switch/toggle orchestration
//! - [`media`] - Devices, constraints, streams and tracks
//! - [`decoder`] - Decoder capability and the linear/matrix engines
//! - [`symbology`] - AIM identifiers and check-digit validation
//! - [`line_source`] - Line-oriented scanner devices (paths, stdin)
//! - [`preview`] - Preview surface capability
//! - [`error`] - Capture error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_capture::{CaptureController, LineSourceDevices};
//! use tally_core::ScanMode;
//!
//! let (mut capture, mut detections) =
//!     CaptureController::new(LineSourceDevices::stdin(), ScanMode::All);
//! capture.start().await?;
//!
//! while let Some(detection) = detections.recv().await {
//!     entries.record_scan(&detection.text);
//! }
//! ```

pub mod controller;
pub mod decoder;
pub mod error;
pub mod line_source;
pub mod media;
pub mod preview;
pub mod symbology;

pub use controller::CaptureController;
pub use decoder::{Decoder, DecoderKind, Detection, DetectionCallback, LinearDecoder, MatrixDecoder};
pub use error::{CaptureError, CaptureResult};
pub use line_source::{LineSourceDevices, STDIN_DEVICE};
pub use media::{
    FacingMode, Frame, FrameHub, MediaConstraints, MediaDeviceInfo, MediaDeviceKind,
    MediaDevices, MediaStream, MediaTrack,
};
pub use preview::{LogPreview, PreviewSurface};
pub use symbology::Symbology;
