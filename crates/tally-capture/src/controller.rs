//! # Capture Controller
//!
//! Owns device selection, the live stream and both decoders.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          start()                                        │
//! │                                                                         │
//! │  stop() ──► enumerate ──► pick device[camera_index] ──► get_user_media │
//! │                              (or first, or none)          │             │
//! │                                                           ▼             │
//! │                               preview.attach ◄──── MediaStream          │
//! │                                                           │             │
//! │              mode 1d  ──► linear.start                    │             │
//! │              mode 2d  ──► matrix.start                    ▼             │
//! │              mode all ──► both, same stream         stream.play()      │
//! │                                                                         │
//! │  stop(): decoders stop ──► every track stops ──► preview.detach        │
//! │  switch_mode(m): stop ──► start        toggle_camera(): index+1, start │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Detections from either decoder arrive on the receiver returned by
//! [`CaptureController::new`]. In `all` mode a payload both engines accept
//! arrives twice.

use std::sync::Arc;

use tally_core::ScanMode;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::decoder::{Decoder, Detection, DetectionCallback, LinearDecoder, MatrixDecoder};
use crate::error::{CaptureError, CaptureResult};
use crate::media::{video_inputs, MediaConstraints, MediaDeviceInfo, MediaDevices, MediaStream};
use crate::preview::{LogPreview, PreviewSurface};

pub struct CaptureController<M: MediaDevices> {
    devices: M,
    preview: Box<dyn PreviewSurface>,
    linear: Box<dyn Decoder>,
    matrix: Box<dyn Decoder>,

    mode: ScanMode,
    camera_index: usize,
    enumerated: Vec<MediaDeviceInfo>,
    active_device: Option<String>,
    stream: Option<MediaStream>,

    detections: mpsc::UnboundedSender<Detection>,
}

impl<M: MediaDevices> CaptureController<M> {
    /// Creates an idle controller with the standard decoders and preview.
    pub fn new(devices: M, mode: ScanMode) -> (Self, mpsc::UnboundedReceiver<Detection>) {
        Self::with_parts(
            devices,
            Box::new(LogPreview::new()),
            Box::new(LinearDecoder::new()),
            Box::new(MatrixDecoder::new()),
            mode,
        )
    }

    /// Creates an idle controller from explicit collaborators.
    pub fn with_parts(
        devices: M,
        preview: Box<dyn PreviewSurface>,
        linear: Box<dyn Decoder>,
        matrix: Box<dyn Decoder>,
        mode: ScanMode,
    ) -> (Self, mpsc::UnboundedReceiver<Detection>) {
        let (detections, rx) = mpsc::unbounded_channel();
        let controller = CaptureController {
            devices,
            preview,
            linear,
            matrix,
            mode,
            camera_index: 0,
            enumerated: Vec::new(),
            active_device: None,
            stream: None,
            detections,
        };
        (controller, rx)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// (Re)starts capture on the current device in the current mode.
    ///
    /// ## Errors
    /// Enumeration, stream and decoder failures propagate; capture is left
    /// stopped.
    pub async fn start(&mut self) -> CaptureResult<()> {
        self.stop();

        self.enumerated = video_inputs(self.devices.enumerate_devices().await?);

        let device_id = self
            .enumerated
            .get(self.camera_index)
            .or_else(|| self.enumerated.first())
            .map(|d| d.device_id.clone());

        debug!(
            camera_index = self.camera_index,
            device = ?device_id,
            devices = self.enumerated.len(),
            "Requesting capture stream"
        );

        let stream = self
            .devices
            .get_user_media(&MediaConstraints::video(device_id))
            .await?;

        self.preview.attach(&stream);
        self.active_device = Some(stream.id().to_string());
        self.stream = Some(stream);

        if let Err(e) = self.start_decoders() {
            warn!(error = %e, "Decoder start failed, stopping capture");
            self.stop();
            return Err(e);
        }

        if let Some(stream) = &self.stream {
            stream.play();
        }

        info!(mode = %self.mode, device = ?self.active_device, "Capture started");
        Ok(())
    }

    fn start_decoders(&mut self) -> CaptureResult<()> {
        let Some(stream) = &self.stream else {
            return Ok(());
        };

        let sink = self.detections.clone();
        let on_detect: DetectionCallback = Arc::new(move |detection| {
            // Closed receiver means the session is shutting down.
            let _ = sink.send(detection);
        });

        if self.mode.runs_linear() {
            self.linear.start(stream, on_detect.clone())?;
        }
        if self.mode.runs_matrix() {
            self.matrix.start(stream, on_detect)?;
        }
        Ok(())
    }

    /// Stops decoders, every track of the stream, and the preview.
    /// Safe when nothing is running.
    pub fn stop(&mut self) {
        if self.linear.is_running() {
            self.linear.stop();
        }
        if self.matrix.is_running() {
            self.matrix.stop();
        }

        if let Some(mut stream) = self.stream.take() {
            stream.stop_all_tracks();
            info!(stream = %stream.id(), "Capture stopped");
        }

        self.preview.detach();
        self.active_device = None;
    }

    /// Switches decoders and restarts capture.
    ///
    /// Persisting the mode is the caller's job and happens first.
    pub async fn switch_mode(&mut self, mode: ScanMode) -> CaptureResult<()> {
        info!(from = %self.mode, to = %mode, "Switching scan mode");
        self.mode = mode;
        self.stop();
        self.start().await
    }

    /// Advances to the next enumerated device and restarts capture.
    ///
    /// ## Errors
    /// [`CaptureError::NoSecondaryCamera`] when at most one device was
    /// enumerated; nothing changes in that case.
    pub async fn toggle_camera(&mut self) -> CaptureResult<()> {
        if self.enumerated.len() <= 1 {
            return Err(CaptureError::NoSecondaryCamera);
        }

        self.camera_index = (self.camera_index + 1) % self.enumerated.len();
        info!(camera_index = self.camera_index, "Toggling camera");
        self.start().await
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn camera_index(&self) -> usize {
        self.camera_index
    }

    /// Devices seen by the last `start`.
    pub fn devices(&self) -> &[MediaDeviceInfo] {
        &self.enumerated
    }

    /// Device the live stream was opened on.
    pub fn active_device(&self) -> Option<&str> {
        self.active_device.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// True while the stream still has a live track or a decoder still has
    /// queued frames. False after end of input means every frame has been
    /// decoded and reported.
    pub fn is_streaming(&self) -> bool {
        self.stream.as_ref().is_some_and(MediaStream::is_active)
            || self.linear.is_running()
            || self.matrix.is_running()
    }

    pub fn preview(&self) -> &dyn PreviewSurface {
        self.preview.as_ref()
    }

    pub fn linear_running(&self) -> bool {
        self.linear.is_running()
    }

    pub fn matrix_running(&self) -> bool {
        self.matrix.is_running()
    }
}

impl<M: MediaDevices> Drop for CaptureController<M> {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{FrameHub, MediaTrack};
    use crate::symbology::Symbology;
    use crate::decoder::DecoderKind;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory devices; each device replays its scripted lines.
    #[derive(Clone, Default)]
    struct MockDevices {
        devices: Vec<(String, &'static str)>,
        fail_open: bool,
        requests: Arc<Mutex<Vec<MediaConstraints>>>,
    }

    impl MockDevices {
        fn with(devices: &[(&str, &'static str)]) -> Self {
            MockDevices {
                devices: devices.iter().map(|(id, s)| (id.to_string(), *s)).collect(),
                ..Default::default()
            }
        }

        fn requests(&self) -> Vec<MediaConstraints> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl MediaDevices for MockDevices {
        async fn enumerate_devices(&self) -> CaptureResult<Vec<MediaDeviceInfo>> {
            Ok(self
                .devices
                .iter()
                .map(|(id, _)| MediaDeviceInfo::video(id.clone(), format!("Mock {}", id)))
                .collect())
        }

        async fn get_user_media(&self, constraints: &MediaConstraints) -> CaptureResult<MediaStream> {
            self.requests.lock().unwrap().push(constraints.clone());
            if self.fail_open {
                return Err(CaptureError::unavailable("mock", "permission denied"));
            }

            let id = constraints.device_id.clone().unwrap_or_else(|| "default".into());
            let script = self
                .devices
                .iter()
                .find(|(d, _)| *d == id)
                .map(|(_, s)| *s)
                .unwrap_or("");

            let frames = FrameHub::new();
            let track = MediaTrack::from_lines(id.clone(), script.as_bytes(), frames.clone())?;
            Ok(MediaStream::new(id, frames, vec![track]))
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Detection>) -> Detection {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_all_mode_runs_both_decoders() {
        let devices = MockDevices::with(&[("cam0", "A1\n")]);
        let (mut controller, mut rx) = CaptureController::new(devices.clone(), ScanMode::All);

        controller.start().await.unwrap();
        assert!(controller.is_running());
        assert!(controller.linear_running());
        assert!(controller.matrix_running());
        assert_eq!(controller.preview().attached(), Some("cam0"));

        let requests = devices.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0], MediaConstraints::video(Some("cam0".into())));

        // Same payload, once per decoder.
        let a = next(&mut rx).await;
        let b = next(&mut rx).await;
        assert_eq!(a.text, "A1");
        assert_eq!(b.text, "A1");
        assert_ne!(a.decoder, b.decoder);
    }

    #[tokio::test]
    async fn test_linear_mode_runs_only_linear() {
        let devices = MockDevices::with(&[("cam0", "]Q1qr-only\n]E04006381333931\n")]);
        let (mut controller, mut rx) = CaptureController::new(devices, ScanMode::Linear);

        controller.start().await.unwrap();
        assert!(controller.linear_running());
        assert!(!controller.matrix_running());

        let detection = next(&mut rx).await;
        assert_eq!(detection.text, "4006381333931");
        assert_eq!(detection.symbology, Symbology::Ean13);
        assert_eq!(detection.decoder, DecoderKind::Linear);
    }

    #[tokio::test]
    async fn test_long_script_is_fully_decoded_before_streaming_ends() {
        let script: &'static str = Box::leak(
            (0..300).map(|i| format!("SKU{}\n", i)).collect::<String>().into_boxed_str(),
        );
        let devices = MockDevices::with(&[("cam0", script)]);
        let (mut controller, mut rx) = CaptureController::new(devices, ScanMode::Linear);
        controller.start().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while controller.is_streaming() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let mut texts = Vec::new();
        while let Ok(detection) = rx.try_recv() {
            texts.push(detection.text);
        }
        assert_eq!(texts.len(), 300);
        assert_eq!(texts[299], "SKU299");
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_releases_everything() {
        let devices = MockDevices::with(&[("cam0", "")]);
        let (mut controller, _rx) = CaptureController::new(devices, ScanMode::All);

        controller.stop();
        assert!(!controller.is_running());

        controller.start().await.unwrap();
        controller.stop();
        controller.stop();

        assert!(!controller.is_running());
        assert!(!controller.linear_running());
        assert!(!controller.matrix_running());
        assert_eq!(controller.preview().attached(), None);
        assert_eq!(controller.active_device(), None);
    }

    #[tokio::test]
    async fn test_restart_stops_previous_stream() {
        let devices = MockDevices::with(&[("cam0", "")]);
        let (mut controller, _rx) = CaptureController::new(devices.clone(), ScanMode::All);

        controller.start().await.unwrap();
        controller.start().await.unwrap();
        assert_eq!(devices.requests().len(), 2);
        assert!(controller.is_running());
    }

    #[tokio::test]
    async fn test_no_devices_requests_default() {
        let devices = MockDevices::default();
        let (mut controller, _rx) = CaptureController::new(devices.clone(), ScanMode::All);

        controller.start().await.unwrap();
        assert_eq!(devices.requests()[0].device_id, None);
        assert_eq!(controller.active_device(), Some("default"));
    }

    #[tokio::test]
    async fn test_open_failure_propagates() {
        let mut devices = MockDevices::with(&[("cam0", "")]);
        devices.fail_open = true;
        let (mut controller, _rx) = CaptureController::new(devices, ScanMode::All);

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable { .. }));
        assert!(!controller.is_running());
        assert!(!controller.linear_running());
    }

    #[tokio::test]
    async fn test_toggle_with_single_device_fails() {
        let devices = MockDevices::with(&[("cam0", "")]);
        let (mut controller, _rx) = CaptureController::new(devices.clone(), ScanMode::All);
        controller.start().await.unwrap();

        let err = controller.toggle_camera().await.unwrap_err();
        assert!(matches!(err, CaptureError::NoSecondaryCamera));
        assert_eq!(err.to_string(), "No secondary camera found!");
        assert_eq!(controller.camera_index(), 0);
        assert_eq!(devices.requests().len(), 1);
        assert!(controller.is_running());
    }

    #[tokio::test]
    async fn test_toggle_cycles_devices() {
        let devices = MockDevices::with(&[("cam0", ""), ("cam1", "")]);
        let (mut controller, _rx) = CaptureController::new(devices, ScanMode::All);
        controller.start().await.unwrap();
        assert_eq!(controller.active_device(), Some("cam0"));

        controller.toggle_camera().await.unwrap();
        assert_eq!(controller.camera_index(), 1);
        assert_eq!(controller.active_device(), Some("cam1"));

        controller.toggle_camera().await.unwrap();
        assert_eq!(controller.camera_index(), 0);
        assert_eq!(controller.active_device(), Some("cam0"));
    }

    #[tokio::test]
    async fn test_switch_mode_restarts() {
        let devices = MockDevices::with(&[("cam0", "")]);
        let (mut controller, _rx) = CaptureController::new(devices.clone(), ScanMode::All);
        controller.start().await.unwrap();

        controller.switch_mode(ScanMode::Matrix).await.unwrap();
        assert_eq!(controller.mode(), ScanMode::Matrix);
        assert!(!controller.linear_running());
        assert!(controller.matrix_running());
        assert_eq!(devices.requests().len(), 2);
    }
}
