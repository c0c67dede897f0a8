//! # Capture Loop
//!
//! Records every detection until the source runs dry or shutdown fires.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  loop select! {                                                         │
//! │      detection   ──► session.record_scan ──► feedback.success           │
//! │      tick        ──► source ended and decoded? ──► leave loop           │
//! │      shutdown    ──► leave loop (Ctrl-C)                                │
//! │  }                                                                      │
//! │  capture.stop() ──► record detections already reported                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::time::Duration;

use tally_capture::{Detection, MediaDevices};
use tally_core::Feedback;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::commands::entries;
use crate::error::CliResult;
use crate::state::{CaptureState, Session};

/// How often the loop checks whether the source has ended.
const SOURCE_POLL: Duration = Duration::from_millis(50);

/// Records one detection.
pub async fn record_detection(
    session: &mut Session,
    feedback: &mut dyn Feedback,
    detection: &Detection,
) -> CliResult<()> {
    debug!(
        code = %detection.text,
        symbology = %detection.symbology,
        decoder = %detection.decoder,
        device = %detection.device_id,
        "Detection"
    );
    entries::scan(session, feedback, &detection.text).await?;
    Ok(())
}

/// Starts capture and records detections until the source ends or
/// `shutdown` completes. Returns the number of detections recorded.
pub async fn run_capture<M, S>(
    session: &mut Session,
    capture: &mut CaptureState<M>,
    detections: &mut mpsc::UnboundedReceiver<Detection>,
    feedback: &mut dyn Feedback,
    shutdown: S,
) -> CliResult<usize>
where
    M: MediaDevices,
    S: Future<Output = ()>,
{
    capture.start().await?;
    info!(
        mode = %capture.controller().mode(),
        device = ?capture.controller().active_device(),
        "Capturing"
    );

    tokio::pin!(shutdown);
    let mut poll = tokio::time::interval(SOURCE_POLL);
    let mut recorded = 0;

    loop {
        tokio::select! {
            Some(detection) = detections.recv() => {
                record_detection(session, feedback, &detection).await?;
                recorded += 1;
            }
            _ = poll.tick() => {
                if !capture.controller().is_streaming() {
                    info!("Capture source ended");
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("Capture interrupted");
                break;
            }
        }
    }

    // Decoders are stopped, so nothing new can arrive.
    capture.stop();
    while let Ok(detection) = detections.try_recv() {
        record_detection(session, feedback, &detection).await?;
        recorded += 1;
    }

    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tally_capture::LineSourceDevices;
    use tally_core::ScanMode;

    use crate::commands::entries::tests::{session, RecordingFeedback};

    fn scanner_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_linear_capture_records_until_end_of_input() {
        let (db, mut s) = session().await;
        db.storage().save_scan_mode(ScanMode::Linear).await.unwrap();
        let file = scanner_file(&["A1", "A1", "4006381333931"]);
        let devices = LineSourceDevices::new([file.path().to_string_lossy().into_owned()]);
        let (mut capture, mut rx) = CaptureState::open(devices, db.storage()).await.unwrap();
        let mut feedback = RecordingFeedback::default();

        let recorded = run_capture(
            &mut s,
            &mut capture,
            &mut rx,
            &mut feedback,
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(recorded, 3);
        let list = s.entries().list();
        assert_eq!(list.len(), 2);
        assert_eq!((list[0].barcode.as_str(), list[0].quantity), ("A1", 2));
        assert_eq!(list[1].barcode, "4006381333931");
        assert!(!capture.controller().is_running());
    }

    #[tokio::test]
    async fn test_long_scanner_file_records_every_line() {
        let (db, mut s) = session().await;
        db.storage().save_scan_mode(ScanMode::Linear).await.unwrap();
        let codes: Vec<String> = (0..300).map(|i| format!("SKU{}", i)).collect();
        let lines: Vec<&str> = codes.iter().map(String::as_str).collect();
        let file = scanner_file(&lines);
        let devices = LineSourceDevices::new([file.path().to_string_lossy().into_owned()]);
        let (mut capture, mut rx) = CaptureState::open(devices, db.storage()).await.unwrap();
        let mut feedback = RecordingFeedback::default();

        let recorded = run_capture(
            &mut s,
            &mut capture,
            &mut rx,
            &mut feedback,
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(recorded, 300);
        let list = s.entries().list();
        assert_eq!(list.len(), 300);
        assert_eq!(list[0].barcode, "SKU0");
        assert_eq!(list[299].barcode, "SKU299");
        assert_eq!(db.storage().load_entries().await.unwrap().len(), 300);
    }

    #[tokio::test]
    async fn test_all_mode_records_both_decoders() {
        let (db, mut s) = session().await;
        let file = scanner_file(&["4006381333931"]);
        let devices = LineSourceDevices::new([file.path().to_string_lossy().into_owned()]);
        let (mut capture, mut rx) = CaptureState::open(devices, db.storage()).await.unwrap();
        let mut feedback = RecordingFeedback::default();

        run_capture(&mut s, &mut capture, &mut rx, &mut feedback, std::future::pending())
            .await
            .unwrap();

        let list = s.entries().list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].quantity, 2);
        assert_eq!(feedback.scanned.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_device_fails_to_start() {
        let (db, mut s) = session().await;
        let devices = LineSourceDevices::new(["/nonexistent/tally-scanner"]);
        let (mut capture, mut rx) = CaptureState::open(devices, db.storage()).await.unwrap();
        let mut feedback = RecordingFeedback::default();

        let result =
            run_capture(&mut s, &mut capture, &mut rx, &mut feedback, std::future::pending()).await;
        assert!(result.is_err());
        assert!(s.entries().is_empty());
    }
}
