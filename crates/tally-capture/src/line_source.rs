//! # Line Source Devices
//!
//! Scanners that decode in hardware and emit one payload per line: USB HID
//! scanners in keyboard-wedge mode, serial scanners exposed as character
//! devices, FIFOs fed by another program, or stdin (`-`).
//!
//! Each configured path is enumerated as a video input. Paths that do not
//! exist at enumeration time are skipped with a warning.

use std::path::Path;

use tokio::fs::File;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, CaptureResult};
use crate::media::{FrameHub, MediaConstraints, MediaDeviceInfo, MediaDevices, MediaStream, MediaTrack};

/// Device id standing for the process's standard input.
pub const STDIN_DEVICE: &str = "-";

/// Line-oriented capture devices at configured paths.
#[derive(Debug, Clone)]
pub struct LineSourceDevices {
    paths: Vec<String>,
}

impl LineSourceDevices {
    pub fn new(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        LineSourceDevices {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Only standard input.
    pub fn stdin() -> Self {
        Self::new([STDIN_DEVICE])
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    fn label(path: &str) -> String {
        if path == STDIN_DEVICE {
            "Standard input".to_string()
        } else {
            Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string())
        }
    }
}

impl MediaDevices for LineSourceDevices {
    async fn enumerate_devices(&self) -> CaptureResult<Vec<MediaDeviceInfo>> {
        let mut devices = Vec::with_capacity(self.paths.len());

        for path in &self.paths {
            if path != STDIN_DEVICE && tokio::fs::metadata(path).await.is_err() {
                warn!(device = %path, "Capture device not present, skipping");
                continue;
            }
            devices.push(MediaDeviceInfo::video(path.clone(), Self::label(path)));
        }

        debug!(count = devices.len(), "Enumerated capture devices");
        Ok(devices)
    }

    async fn get_user_media(&self, constraints: &MediaConstraints) -> CaptureResult<MediaStream> {
        // Line sources have no facing; without a device id the first
        // configured path is the default, then stdin.
        let device = constraints
            .device_id
            .clone()
            .or_else(|| self.paths.first().cloned())
            .unwrap_or_else(|| STDIN_DEVICE.to_string());

        let frames = FrameHub::new();
        let track = if device == STDIN_DEVICE {
            MediaTrack::from_lines(device.clone(), tokio::io::stdin(), frames.clone())?
        } else {
            let file = File::open(&device)
                .await
                .map_err(|e| CaptureError::unavailable(device.clone(), e))?;
            MediaTrack::from_lines(device.clone(), file, frames.clone())?
        };

        info!(device = %device, "Capture stream opened");
        Ok(MediaStream::new(device, frames, vec![track]))
    }
}
