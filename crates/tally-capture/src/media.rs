//! # Media Streams
//!
//! Device enumeration and stream acquisition.
//!
//! ## Stream Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           MediaStream                                   │
//! │                                                                         │
//! │  ┌──────────────┐  Frame   ┌──────────┐  mpsc (bounded)                 │
//! │  │ MediaTrack   │─────────►│ FrameHub │──────────────► decoder A        │
//! │  │ reader task  │ publish  │          │──────────────► decoder B        │
//! │  │ live flag    │ .await   └──────────┘  one per subscribe()            │
//! │  └──────────────┘                                                       │
//! │                                                                         │
//! │  play()  ── opens the track gates; frames read before any decoder       │
//! │             subscribed would otherwise be lost                          │
//! │  end of input ── hub closes; decoders drain what is queued, then exit   │
//! │  stop_all_tracks() ── clears live flags, aborts reader tasks            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reader waits for room in every subscriber's queue before reading the
//! next line, so a slow decoder slows the source down instead of losing
//! frames.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{CaptureError, CaptureResult};

/// Frames queued per subscriber before the source waits.
pub const FRAME_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Devices & Constraints
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
}

/// One enumerated capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub label: String,
    pub kind: MediaDeviceKind,
}

impl MediaDeviceInfo {
    pub fn video(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        MediaDeviceInfo {
            device_id: device_id.into(),
            label: label.into(),
            kind: MediaDeviceKind::VideoInput,
        }
    }
}

/// Which way the requested camera should face. A hint only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    Environment,
    User,
}

/// What a stream request asks for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaConstraints {
    /// Exact device, or `None` to let the source pick its default.
    pub device_id: Option<String>,
    pub facing_mode: FacingMode,
}

impl MediaConstraints {
    /// Rear-facing request for `device_id`.
    pub fn video(device_id: Option<String>) -> Self {
        MediaConstraints {
            device_id,
            facing_mode: FacingMode::Environment,
        }
    }
}

/// Device enumeration and stream acquisition capability.
pub trait MediaDevices: Send + Sync {
    /// Lists the devices currently available.
    fn enumerate_devices(
        &self,
    ) -> impl Future<Output = CaptureResult<Vec<MediaDeviceInfo>>> + Send;

    /// Opens a stream satisfying `constraints`.
    fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> impl Future<Output = CaptureResult<MediaStream>> + Send;
}

/// Keeps only video inputs, in enumeration order.
pub fn video_inputs(devices: Vec<MediaDeviceInfo>) -> Vec<MediaDeviceInfo> {
    devices
        .into_iter()
        .filter(|d| d.kind == MediaDeviceKind::VideoInput)
        .collect()
}

// =============================================================================
// Frames
// =============================================================================

/// One unit of captured input: a payload as handed over by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub device_id: String,
    pub payload: String,
}

// =============================================================================
// Frame Hub
// =============================================================================

#[derive(Debug, Default)]
struct HubState {
    subscribers: Vec<mpsc::Sender<Frame>>,
    closed: bool,
}

/// Delivers every published frame to every subscriber, waiting for queue
/// space rather than dropping.
#[derive(Debug, Clone, Default)]
pub struct FrameHub {
    state: Arc<Mutex<HubState>>,
}

impl FrameHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// New receiver for frames published from now on. On a closed hub the
    /// receiver ends immediately.
    pub fn subscribe(&self) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let mut state = self.state();
        if !state.closed {
            state.subscribers.push(tx);
        }
        rx
    }

    /// Hands `frame` to every subscriber, waiting while a queue is full.
    /// Subscribers whose receiver is gone are dropped. Returns how many
    /// subscribers took the frame.
    pub async fn publish(&self, frame: Frame) -> usize {
        let targets = self.state().subscribers.clone();

        let mut delivered = 0;
        for tx in &targets {
            if tx.send(frame.clone()).await.is_ok() {
                delivered += 1;
            }
        }

        if delivered < targets.len() {
            self.state().subscribers.retain(|tx| !tx.is_closed());
        }
        delivered
    }

    /// Ends every subscription once its queue is drained. Later publishes
    /// go nowhere.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }
}

// =============================================================================
// Tracks
// =============================================================================

/// A single input track of a stream.
#[derive(Debug)]
pub struct MediaTrack {
    id: String,
    live: Arc<AtomicBool>,
    gate: Arc<Notify>,
    reader: Option<JoinHandle<()>>,
}

impl MediaTrack {
    /// A track with no reader task (for sources fed externally).
    pub fn detached(id: impl Into<String>) -> Self {
        MediaTrack {
            id: id.into(),
            live: Arc::new(AtomicBool::new(true)),
            gate: Arc::new(Notify::new()),
            reader: None,
        }
    }

    /// Spawns a reader that turns each line of `reader` into a [`Frame`].
    ///
    /// Reading starts at [`MediaTrack::play`]. Blank lines and trailing `\r`
    /// are dropped. At end of input the hub is closed and the track goes
    /// dead.
    pub fn from_lines<R>(
        id: impl Into<String>,
        reader: R,
        frames: FrameHub,
    ) -> CaptureResult<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| CaptureError::NoRuntime)?;
        let mut track = MediaTrack::detached(id);

        let device_id = track.id.clone();
        let live = track.live.clone();
        let gate = track.gate.clone();

        track.reader = Some(runtime.spawn(async move {
            gate.notified().await;
            debug!(device = %device_id, "Track reading");

            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let payload = line.trim_end_matches('\r');
                        if payload.is_empty() {
                            continue;
                        }
                        let frame = Frame {
                            device_id: device_id.clone(),
                            payload: payload.to_string(),
                        };
                        if frames.publish(frame).await == 0 {
                            trace!(device = %device_id, "No decoder subscribed, frame dropped");
                        }
                    }
                    Ok(None) => {
                        debug!(device = %device_id, "Track reached end of input");
                        break;
                    }
                    Err(e) => {
                        warn!(device = %device_id, error = %e, "Track read failed");
                        break;
                    }
                }
            }

            frames.close();
            live.store(false, Ordering::SeqCst);
        }));

        Ok(track)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True until stopped or, for reader tracks, until input ends.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Lets the reader start delivering frames.
    pub fn play(&self) {
        self.gate.notify_one();
    }

    /// Stops the track. Idempotent.
    pub fn stop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for MediaTrack {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Stream
// =============================================================================

/// A frame source plus the tracks feeding it.
#[derive(Debug)]
pub struct MediaStream {
    id: String,
    frames: FrameHub,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(
        id: impl Into<String>,
        frames: FrameHub,
        tracks: Vec<MediaTrack>,
    ) -> Self {
        MediaStream {
            id: id.into(),
            frames,
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// New receiver for frames published from now on.
    pub fn subscribe(&self) -> mpsc::Receiver<Frame> {
        self.frames.subscribe()
    }

    /// Publishing side, for sources that push frames themselves.
    pub fn frames(&self) -> &FrameHub {
        &self.frames
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// True while any track is live.
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    /// Starts delivery on every track.
    pub fn play(&self) {
        for track in &self.tracks {
            track.play();
        }
    }

    /// Stops every track.
    pub fn stop_all_tracks(&mut self) {
        for track in &mut self.tracks {
            track.stop();
        }
        debug!(stream = %self.id, tracks = self.tracks.len(), "Stream tracks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lines_become_frames_after_play() {
        let frames = FrameHub::new();
        let input: &'static [u8] = b"A1\r\n\nB2\n";
        let track = MediaTrack::from_lines("dev0", input, frames.clone()).unwrap();
        let stream = MediaStream::new("s1", frames, vec![track]);
        let mut rx = stream.subscribe();

        stream.play();

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.payload, "A1");
        assert_eq!(first.device_id, "dev0");

        let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.payload, "B2");

        // End of input closes the hub.
        let end = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert!(end.is_none());
        assert!(stream.frames().is_closed());
    }

    #[tokio::test]
    async fn test_slow_subscriber_loses_nothing() {
        let frames = FrameHub::new();
        let count = FRAME_CHANNEL_CAPACITY * 4 + 3;
        let input: String = (0..count).map(|i| format!("SKU{}\n", i)).collect();
        let track = MediaTrack::from_lines("dev0", std::io::Cursor::new(input.into_bytes()), frames.clone())
            .unwrap();
        let stream = MediaStream::new("s1", frames, vec![track]);
        let mut rx = stream.subscribe();

        stream.play();
        // Let the reader fill the queue before anything is consumed.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut payloads = Vec::new();
        while let Some(frame) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
        {
            payloads.push(frame.payload);
        }

        assert_eq!(payloads.len(), count);
        assert_eq!(payloads[0], "SKU0");
        assert_eq!(payloads[count - 1], format!("SKU{}", count - 1));
    }

    #[tokio::test]
    async fn test_hub_prunes_dropped_subscribers() {
        let hub = FrameHub::new();
        let mut kept = hub.subscribe();
        drop(hub.subscribe());
        assert_eq!(hub.subscriber_count(), 2);

        let frame = Frame {
            device_id: "dev0".into(),
            payload: "A1".into(),
        };
        assert_eq!(hub.publish(frame).await, 1);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(kept.recv().await.unwrap().payload, "A1");

        hub.close();
        assert!(kept.recv().await.is_none());
        assert!(hub.subscribe().recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_all_tracks() {
        let frames = FrameHub::new();
        let (_keep_open, reader) = tokio::io::duplex(64);
        let track = MediaTrack::from_lines("dev0", reader, frames.clone()).unwrap();
        let mut stream = MediaStream::new("s1", frames, vec![track, MediaTrack::detached("dev1")]);

        assert!(stream.is_active());
        stream.stop_all_tracks();
        assert!(!stream.is_active());
        assert!(stream.tracks().iter().all(|t| !t.is_live()));

        stream.stop_all_tracks();
        assert!(!stream.is_active());
    }

    #[test]
    fn test_reader_track_needs_runtime() {
        let frames = FrameHub::new();
        let input: &'static [u8] = b"A1\n";
        assert!(matches!(
            MediaTrack::from_lines("dev0", input, frames),
            Err(CaptureError::NoRuntime)
        ));
    }

    #[test]
    fn test_video_inputs_filter() {
        let devices = vec![
            MediaDeviceInfo::video("v0", "Front"),
            MediaDeviceInfo {
                device_id: "a0".into(),
                label: "Mic".into(),
                kind: MediaDeviceKind::AudioInput,
            },
            MediaDeviceInfo::video("v1", "Rear"),
        ];
        let ids: Vec<String> = video_inputs(devices).into_iter().map(|d| d.device_id).collect();
        assert_eq!(ids, vec!["v0", "v1"]);
    }

    #[test]
    fn test_constraints_face_environment() {
        let c = MediaConstraints::video(Some("v1".into()));
        assert_eq!(c.facing_mode, FacingMode::Environment);
        assert_eq!(c.device_id.as_deref(), Some("v1"));
    }
}
