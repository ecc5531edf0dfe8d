//! Decode coordinator
//!
//! Reverses the encode pipeline: container -> frames -> QR decode -> text.
//! Recovery is best-effort per frame; a frame that fails to decode is
//! dropped and the rest of the batch still comes back. Catastrophic
//! failures (missing file, bad magic, no frames section) surface as errors.

use crate::media::{QrFrameDecoder, VideoDecoder};
use anyhow::Result;
use std::path::Path;
use tracing::debug;

/// Drives frame extraction and QR decoding for retrieval.
pub struct DecodeCoordinator {
    video: Box<dyn VideoDecoder>,
    qr: Box<dyn QrFrameDecoder>,
}

impl DecodeCoordinator {
    pub fn new(video: Box<dyn VideoDecoder>, qr: Box<dyn QrFrameDecoder>) -> Self {
        Self { video, qr }
    }

    /// Decode every frame of the container at `path`.
    pub fn retrieve(&self, path: &Path) -> Result<Vec<String>> {
        self.retrieve_frames(path, None)
    }

    /// Decode the frames named by `indices` (all frames when `None`),
    /// returning successfully decoded payloads in decode order.
    pub fn retrieve_frames(&self, path: &Path, indices: Option<&[u32]>) -> Result<Vec<String>> {
        let info = self.video.get_info(path)?;
        debug!(
            path = %path.display(),
            total_frames = info.total_frames,
            codec = %info.codec,
            "retrieving frames"
        );

        let frames = self.video.extract_frames(path, indices)?;
        let mut payloads = Vec::with_capacity(frames.len());

        for frame in &frames {
            match self.qr.decode(frame) {
                Ok(text) => payloads.push(text),
                Err(e) => {
                    debug!(frame = frame.number, error = %e, "dropping undecodable frame");
                }
            }
        }

        Ok(payloads)
    }
}
