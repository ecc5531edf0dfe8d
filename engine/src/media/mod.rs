//! Media collaborators: QR symbology and the video container
//!
//! The pipeline coordinators drive these contracts and never touch a codec
//! directly. Shipped implementations are the `qrcode`/`rqrr` adapters and
//! the framed `KVID` binary container; anything speaking the same traits
//! (a hardware encoder, an external-tool shell-out) slots in unchanged.

pub mod kvid;
pub mod qr;

pub use kvid::{KvidDecoder, KvidEncoder};
pub use qr::{QrCodeGenerator, RqrrQrDecoder};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

// ============================================================================
// QR contracts
// ============================================================================

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EccLevel {
    Low,
    Medium,
    Quartile,
    High,
}

impl Default for EccLevel {
    fn default() -> Self {
        EccLevel::Medium
    }
}

/// Rendering options passed to a [`QrGenerator`].
#[derive(Debug, Clone, Default)]
pub struct QrOptions {
    /// Fixed symbol version (1..=40); `None` picks the smallest that fits
    pub version: Option<i16>,
    pub ecc: EccLevel,
}

/// Rendered QR symbol: one byte per pixel, 0 = dark, 255 = light.
#[derive(Debug, Clone)]
pub struct QrImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

/// What a generator can encode.
#[derive(Debug, Clone)]
pub struct QrCapabilities {
    /// Largest payload in bytes any supported configuration can hold
    pub max_data_capacity: usize,
    pub supported_versions: RangeInclusive<i16>,
    pub supported_ecc_levels: Vec<EccLevel>,
}

/// Renders text payloads into grayscale QR symbols.
pub trait QrGenerator {
    fn generate(&self, text: &str, options: &QrOptions) -> Result<QrImage>;
    fn capabilities(&self) -> QrCapabilities;
}

/// Recovers text payloads from video frames.
pub trait QrFrameDecoder {
    fn decode(&self, frame: &VideoFrame) -> Result<String>;

    fn decode_batch(&self, frames: &[VideoFrame]) -> Vec<Result<String>> {
        frames.iter().map(|frame| self.decode(frame)).collect()
    }
}

// ============================================================================
// Video contracts
// ============================================================================

/// Encoder initialization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingParams {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            fps: 30,
        }
    }
}

/// Statistics reported by [`VideoEncoder::finalize`].
#[derive(Debug, Clone, Serialize)]
pub struct EncodingStats {
    pub total_frames: u32,
    pub file_size: u64,
    pub duration_seconds: f64,
    pub average_bitrate: f64,
    pub codec: String,
    pub encoding_time_ms: u64,
}

/// Container metadata reported by [`VideoDecoder::get_info`].
#[derive(Debug, Clone, Serialize)]
pub struct VideoInfo {
    pub total_frames: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_seconds: f64,
    pub codec: String,
}

/// One extracted frame, tightly packed RGB24.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub number: u32,
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Writes frames into a container.
///
/// Frames must arrive in strictly increasing `frame_number` starting at 0.
/// `finalize` either produces a complete file or fails without clobbering an
/// existing one; `cancel` releases resources and never fails.
pub trait VideoEncoder {
    fn init(&mut self, params: &EncodingParams) -> Result<()>;
    fn add_frame(&mut self, rgb: &[u8], frame_number: u32) -> Result<()>;
    fn finalize(&mut self, path: &Path) -> Result<EncodingStats>;
    fn cancel(&mut self);
}

/// Reads frames back out of a container.
pub trait VideoDecoder {
    fn get_info(&self, path: &Path) -> Result<VideoInfo>;

    /// Extract the frames named by `indices`, or all frames when `None`.
    fn extract_frames(&self, path: &Path, indices: Option<&[u32]>) -> Result<Vec<VideoFrame>>;
}
