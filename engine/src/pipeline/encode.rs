//! Encode coordinator
//!
//! State machine that turns buffered text into a frame-per-chunk container:
//! `Idle -> Buffered -> Building -> Buffered`. Preconditions are checked
//! before the encoder is touched, so a rejected build mutates nothing; a
//! failure mid-build cancels the encoder and keeps the buffer so the caller
//! can retry after fixing the condition.

use crate::media::{EncodingParams, EncodingStats, QrGenerator, QrImage, QrOptions, VideoEncoder};
use crate::text::{Chunk, TextChunker};
use anyhow::{bail, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Coordinator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeState {
    Idle,
    Buffered,
    Building,
}

/// Buffer inspection snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStats {
    pub state: EncodeState,
    pub message_count: usize,
    pub chunk_count: usize,
    pub buffered_chars: usize,
}

/// Encoder statistics annotated with the coordinator's total wall time.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub encoder: EncodingStats,
    pub total_time_ms: u64,
}

/// Buffers chunks and drives the QR generator + video encoder.
pub struct EncodeCoordinator {
    chunker: TextChunker,
    qr: Box<dyn QrGenerator>,
    encoder: Box<dyn VideoEncoder>,
    qr_options: QrOptions,
    chunks: Vec<Chunk>,
    message_count: usize,
    state: EncodeState,
}

impl EncodeCoordinator {
    pub fn new(
        chunker: TextChunker,
        qr: Box<dyn QrGenerator>,
        encoder: Box<dyn VideoEncoder>,
        qr_options: QrOptions,
    ) -> Self {
        Self {
            chunker,
            qr,
            encoder,
            qr_options,
            chunks: Vec::new(),
            message_count: 0,
            state: EncodeState::Idle,
        }
    }

    /// Chunk `text` and append to the buffer. Returns how many chunks the
    /// message produced.
    pub fn add_message(&mut self, text: &str) -> usize {
        let new_chunks = self.chunker.chunk_with_parent(text, Some(self.message_count));
        let added = new_chunks.len();
        self.chunks.extend(new_chunks);
        self.message_count += 1;
        if !self.chunks.is_empty() {
            self.state = EncodeState::Buffered;
        }
        debug!(added, total = self.chunks.len(), "buffered message chunks");
        added
    }

    /// Buffered chunks in frame order; chunk index == frame number.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            state: self.state,
            message_count: self.message_count,
            chunk_count: self.chunks.len(),
            buffered_chars: self.chunks.iter().map(|c| c.content.len()).sum(),
        }
    }

    /// Reset the buffer and return to `Idle`.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.message_count = 0;
        self.state = EncodeState::Idle;
    }

    /// Atomic build: every buffered chunk becomes one frame of the container
    /// at `path`, frame number equal to its buffer index.
    pub fn build_video(&mut self, path: &Path, params: &EncodingParams) -> Result<BuildReport> {
        // Fail fast without touching the encoder or the output
        if self.state == EncodeState::Building {
            bail!("Coordinator is busy with another build");
        }
        if self.chunks.is_empty() {
            bail!("No buffered chunks to encode; call add_message first");
        }

        let capabilities = self.qr.capabilities();
        if !capabilities.supported_ecc_levels.contains(&self.qr_options.ecc) {
            bail!(
                "QR generator does not support ECC level {:?}",
                self.qr_options.ecc
            );
        }
        for (index, chunk) in self.chunks.iter().enumerate() {
            if chunk.content.len() > capabilities.max_data_capacity {
                bail!(
                    "Chunk {} is {} bytes, exceeding QR capacity of {}",
                    index,
                    chunk.content.len(),
                    capabilities.max_data_capacity
                );
            }
        }

        self.state = EncodeState::Building;
        let started = Instant::now();

        match self.run_build(path, params) {
            Ok(stats) => {
                self.state = EncodeState::Buffered;
                let report = BuildReport {
                    total_time_ms: started.elapsed().as_millis() as u64,
                    encoder: stats,
                };
                info!(
                    frames = report.encoder.total_frames,
                    bytes = report.encoder.file_size,
                    total_ms = report.total_time_ms,
                    "built video container"
                );
                Ok(report)
            }
            Err(e) => {
                // Release encoder resources; the buffer survives for retry
                self.encoder.cancel();
                self.state = EncodeState::Buffered;
                Err(e)
            }
        }
    }

    fn run_build(&mut self, path: &Path, params: &EncodingParams) -> Result<EncodingStats> {
        self.encoder.init(params)?;

        for (index, chunk) in self.chunks.iter().enumerate() {
            let qr = self.qr.generate(&chunk.content, &self.qr_options)?;
            let rgb = scale_to_rgb(&qr, params.width, params.height);
            self.encoder.add_frame(&rgb, index as u32)?;
        }

        self.encoder.finalize(path)
    }
}

/// Nearest-neighbor scale of a grayscale symbol onto an RGB24 frame.
fn scale_to_rgb(qr: &QrImage, width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut rgb = vec![0u8; w * h * 3];

    for y in 0..h {
        let sy = y * qr.height / h;
        for x in 0..w {
            let sx = x * qr.width / w;
            let value = qr.pixels[sy * qr.width + sx];
            let offset = (y * w + x) * 3;
            rgb[offset] = value;
            rgb[offset + 1] = value;
            rgb[offset + 2] = value;
        }
    }

    rgb
}
