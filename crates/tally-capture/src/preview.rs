//! # Preview Surface
//!
//! Where a live stream is shown while capturing. Line-source scanners have no
//! picture, so the default surface records which stream is attached and
//! logs the transitions.

use tracing::info;

use crate::media::MediaStream;

/// Display target for a live stream.
pub trait PreviewSurface: Send {
    fn attach(&mut self, stream: &MediaStream);

    /// Detaches the current stream, if any. Idempotent.
    fn detach(&mut self);

    /// Id of the attached stream.
    fn attached(&self) -> Option<&str>;
}

/// Preview surface that only tracks and logs attachment.
#[derive(Debug, Default)]
pub struct LogPreview {
    attached: Option<String>,
}

impl LogPreview {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreviewSurface for LogPreview {
    fn attach(&mut self, stream: &MediaStream) {
        info!(stream = %stream.id(), "Preview attached");
        self.attached = Some(stream.id().to_string());
    }

    fn detach(&mut self) {
        if let Some(id) = self.attached.take() {
            info!(stream = %id, "Preview detached");
        }
    }

    fn attached(&self) -> Option<&str> {
        self.attached.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::FrameHub;

    #[test]
    fn test_attach_detach() {
        let stream = MediaStream::new("cam0", FrameHub::new(), Vec::new());
        let mut preview = LogPreview::new();
        assert_eq!(preview.attached(), None);

        preview.attach(&stream);
        assert_eq!(preview.attached(), Some("cam0"));

        preview.detach();
        preview.detach();
        assert_eq!(preview.attached(), None);
    }
}
