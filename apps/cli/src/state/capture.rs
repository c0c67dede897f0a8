//! # Capture State
//!
//! Wraps the capture controller with the stored scan mode.

use tally_capture::{CaptureController, CaptureResult, Detection, MediaDevices};
use tally_core::ScanMode;
use tally_db::StorageRepository;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::CliResult;

pub struct CaptureState<M: MediaDevices> {
    controller: CaptureController<M>,
    storage: StorageRepository,
}

impl<M: MediaDevices> CaptureState<M> {
    /// Creates an idle controller in the stored scan mode.
    pub async fn open(
        devices: M,
        storage: StorageRepository,
    ) -> CliResult<(Self, mpsc::UnboundedReceiver<Detection>)> {
        let mode = storage.load_scan_mode().await?;
        let (controller, detections) = CaptureController::new(devices, mode);
        info!(mode = %mode, "Capture ready");
        Ok((CaptureState { controller, storage }, detections))
    }

    pub async fn start(&mut self) -> CaptureResult<()> {
        self.controller.start().await
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    /// Stores the new mode, then restarts capture in it.
    ///
    /// The mode stays stored even when the restart fails.
    pub async fn switch_mode(&mut self, mode: ScanMode) -> CliResult<()> {
        self.storage.save_scan_mode(mode).await?;
        self.controller.switch_mode(mode).await?;
        Ok(())
    }

    pub async fn toggle_camera(&mut self) -> CaptureResult<()> {
        self.controller.toggle_camera().await
    }

    pub fn controller(&self) -> &CaptureController<M> {
        &self.controller
    }
}
