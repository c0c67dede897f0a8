//! # Decoders
//!
//! Decoding collaborators. Each decoder subscribes to a stream's frames on
//! `start` and reports every payload it claims through the detection
//! callback, once per frame. Two decoders attached to the same stream see
//! the same frames independently; nothing de-duplicates across them.
//!
//! A decoder exits once its source closes and its queue is empty, so
//! `is_running` turning false after end of input means every frame was seen.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{CaptureError, CaptureResult};
use crate::media::MediaStream;
use crate::symbology::{recognize_linear, recognize_matrix, Symbology};

/// Which engine produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderKind {
    Linear,
    Matrix,
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderKind::Linear => f.write_str("1d"),
            DecoderKind::Matrix => f.write_str("2d"),
        }
    }
}

/// A successful decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Decoded text, symbology identifier removed.
    pub text: String,
    pub symbology: Symbology,
    pub decoder: DecoderKind,
    pub device_id: String,
}

/// Receives detections as they happen.
pub type DetectionCallback = Arc<dyn Fn(Detection) + Send + Sync>;

/// Decoding collaborator capability.
pub trait Decoder: Send {
    fn kind(&self) -> DecoderKind;

    /// Starts decoding `source`. A running decoder is restarted.
    fn start(&mut self, source: &MediaStream, on_detect: DetectionCallback) -> CaptureResult<()>;

    /// Stops decoding. Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

// =============================================================================
// Frame Engine
// =============================================================================

type Recognizer = fn(&str) -> Option<(Symbology, &str)>;

/// Shared task plumbing for the concrete decoders.
#[derive(Debug, Default)]
struct FrameEngine {
    task: Option<JoinHandle<()>>,
}

impl FrameEngine {
    fn start(
        &mut self,
        kind: DecoderKind,
        recognize: Recognizer,
        source: &MediaStream,
        on_detect: DetectionCallback,
    ) -> CaptureResult<()> {
        self.stop();

        let runtime = Handle::try_current().map_err(|_| CaptureError::NoRuntime)?;
        // Subscribe before spawning so no frame sent after start() is missed.
        let mut frames = source.subscribe();
        let stream_id = source.id().to_string();

        self.task = Some(runtime.spawn(async move {
            debug!(decoder = %kind, stream = %stream_id, "Decoder running");
            while let Some(frame) = frames.recv().await {
                let Some((symbology, text)) = recognize(&frame.payload) else {
                    trace!(decoder = %kind, "Frame not claimed");
                    continue;
                };
                debug!(decoder = %kind, %symbology, code = %text, "Detected");
                on_detect(Detection {
                    text: text.to_string(),
                    symbology,
                    decoder: kind,
                    device_id: frame.device_id,
                });
            }
            debug!(decoder = %kind, "Decoder source closed");
        }));

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for FrameEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Concrete Decoders
// =============================================================================

/// Linear symbologies: Code 128, EAN-13, EAN-8, UPC-A, UPC-E.
#[derive(Debug, Default)]
pub struct LinearDecoder {
    engine: FrameEngine,
}

impl LinearDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LinearDecoder {
    fn kind(&self) -> DecoderKind {
        DecoderKind::Linear
    }

    fn start(&mut self, source: &MediaStream, on_detect: DetectionCallback) -> CaptureResult<()> {
        self.engine
            .start(DecoderKind::Linear, recognize_linear, source, on_detect)
    }

    fn stop(&mut self) {
        self.engine.stop();
    }

    fn is_running(&self) -> bool {
        self.engine.is_running()
    }
}

/// Matrix symbologies: QR, Data Matrix, Aztec, PDF417.
#[derive(Debug, Default)]
pub struct MatrixDecoder {
    engine: FrameEngine,
}

impl MatrixDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for MatrixDecoder {
    fn kind(&self) -> DecoderKind {
        DecoderKind::Matrix
    }

    fn start(&mut self, source: &MediaStream, on_detect: DetectionCallback) -> CaptureResult<()> {
        self.engine
            .start(DecoderKind::Matrix, recognize_matrix, source, on_detect)
    }

    fn stop(&mut self) {
        self.engine.stop();
    }

    fn is_running(&self) -> bool {
        self.engine.is_running()
    }
}
