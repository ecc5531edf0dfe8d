//! Framed binary video container (`KVID`)
//!
//! Codec-free container whose frames map 1:1 to chunks. Layout:
//!
//! ```text
//! "KVID" | version u8 | codec u8 | pixel-format u8 | reserved u8
//! width u32 | height u32 | fps u32 | frame_count u32        (big-endian)
//! then per frame:
//! frame_number u32 | timestamp_ms u64 | payload_size u32 | payload
//! ```
//!
//! The encoder buffers frame records and writes the whole file on
//! `finalize` via temp file + rename, so a cancelled or failed build can
//! never leave a truncated container behind an existing good one.

use super::{EncodingParams, EncodingStats, VideoDecoder, VideoEncoder, VideoFrame, VideoInfo};
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

const KVID_MAGIC: &[u8; 4] = b"KVID";
const KVID_VERSION: u8 = 1;
const CODEC_RAW: u8 = 1;
const PIXEL_RGB24: u8 = 1;
const HEADER_LEN: usize = 24;

const CODEC_NAME: &str = "kvid/raw-rgb24";

struct EncoderSession {
    params: EncodingParams,
    /// Serialized frame records, appended in order
    body: Vec<u8>,
    frame_count: u32,
    started: Instant,
}

/// [`VideoEncoder`] writing the `KVID` container.
#[derive(Default)]
pub struct KvidEncoder {
    session: Option<EncoderSession>,
}

impl KvidEncoder {
    pub fn new() -> Self {
        Self { session: None }
    }
}

impl VideoEncoder for KvidEncoder {
    fn init(&mut self, params: &EncodingParams) -> Result<()> {
        if self.session.is_some() {
            bail!("Encoder already initialized; finalize or cancel first");
        }
        if params.width == 0 || params.height == 0 {
            bail!(
                "Frame dimensions must be non-zero, got {}x{}",
                params.width,
                params.height
            );
        }
        if params.fps == 0 {
            bail!("fps must be > 0");
        }

        self.session = Some(EncoderSession {
            params: params.clone(),
            body: Vec::new(),
            frame_count: 0,
            started: Instant::now(),
        });
        Ok(())
    }

    fn add_frame(&mut self, rgb: &[u8], frame_number: u32) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .context("add_frame called before init")?;

        let expected = session.params.width as usize * session.params.height as usize * 3;
        if rgb.len() != expected {
            bail!(
                "Frame {} payload is {} bytes, expected {} for {}x{} RGB24",
                frame_number,
                rgb.len(),
                expected,
                session.params.width,
                session.params.height
            );
        }
        if frame_number != session.frame_count {
            bail!(
                "Frames must be delivered in order: expected frame {}, got {}",
                session.frame_count,
                frame_number
            );
        }

        let timestamp_ms = frame_number as u64 * 1000 / session.params.fps as u64;
        session.body.extend_from_slice(&frame_number.to_be_bytes());
        session.body.extend_from_slice(&timestamp_ms.to_be_bytes());
        session
            .body
            .extend_from_slice(&(rgb.len() as u32).to_be_bytes());
        session.body.extend_from_slice(rgb);
        session.frame_count += 1;
        Ok(())
    }

    fn finalize(&mut self, path: &Path) -> Result<EncodingStats> {
        let session = self
            .session
            .take()
            .context("finalize called before init")?;

        let temp_path = path.with_extension("kvid.tmp");

        {
            let file = File::create(&temp_path).context("Failed to create container temp file")?;
            let mut writer = BufWriter::new(file);

            writer.write_all(KVID_MAGIC)?;
            writer.write_all(&[KVID_VERSION, CODEC_RAW, PIXEL_RGB24, 0])?;
            writer.write_all(&session.params.width.to_be_bytes())?;
            writer.write_all(&session.params.height.to_be_bytes())?;
            writer.write_all(&session.params.fps.to_be_bytes())?;
            writer.write_all(&session.frame_count.to_be_bytes())?;
            writer.write_all(&session.body)?;

            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        std::fs::rename(&temp_path, path).context("Failed to rename container file")?;

        let file_size = HEADER_LEN as u64 + session.body.len() as u64;
        let duration_seconds = session.frame_count as f64 / session.params.fps as f64;
        let average_bitrate = if duration_seconds > 0.0 {
            file_size as f64 * 8.0 / duration_seconds
        } else {
            0.0
        };

        debug!(
            path = %path.display(),
            frames = session.frame_count,
            bytes = file_size,
            "finalized container"
        );

        Ok(EncodingStats {
            total_frames: session.frame_count,
            file_size,
            duration_seconds,
            average_bitrate,
            codec: CODEC_NAME.to_string(),
            encoding_time_ms: session.started.elapsed().as_millis() as u64,
        })
    }

    fn cancel(&mut self) {
        // Nothing has touched the filesystem yet; dropping the buffered
        // session is the whole cleanup.
        self.session = None;
    }
}

fn read_u32(reader: &mut impl Read) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64(reader: &mut impl Read) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

struct Header {
    width: u32,
    height: u32,
    fps: u32,
    frame_count: u32,
}

/// [`VideoDecoder`] reading the `KVID` container.
#[derive(Debug, Default)]
pub struct KvidDecoder;

impl KvidDecoder {
    pub fn new() -> Self {
        Self
    }

    fn read_header(reader: &mut impl Read) -> Result<Header> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .context("Failed to read container magic")?;
        if &magic != KVID_MAGIC {
            bail!("Not a KVID container: bad magic {:?}", magic);
        }

        let mut tags = [0u8; 4];
        reader.read_exact(&mut tags).context("Failed to read container tags")?;
        let [version, codec, pixel_format, _reserved] = tags;
        if version != KVID_VERSION {
            bail!(
                "Unsupported container version {}: expected {}",
                version,
                KVID_VERSION
            );
        }
        if codec != CODEC_RAW || pixel_format != PIXEL_RGB24 {
            bail!(
                "Unsupported codec/pixel-format tags: {}/{}",
                codec,
                pixel_format
            );
        }

        Ok(Header {
            width: read_u32(reader)?,
            height: read_u32(reader)?,
            fps: read_u32(reader)?,
            frame_count: read_u32(reader)?,
        })
    }
}

impl VideoDecoder for KvidDecoder {
    fn get_info(&self, path: &Path) -> Result<VideoInfo> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open container {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let header = Self::read_header(&mut reader)?;

        let duration_seconds = if header.fps > 0 {
            header.frame_count as f64 / header.fps as f64
        } else {
            0.0
        };

        Ok(VideoInfo {
            total_frames: header.frame_count,
            width: header.width,
            height: header.height,
            fps: header.fps,
            duration_seconds,
            codec: CODEC_NAME.to_string(),
        })
    }

    fn extract_frames(&self, path: &Path, indices: Option<&[u32]>) -> Result<Vec<VideoFrame>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open container {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let header = Self::read_header(&mut reader)?;

        let expected_payload = header.width as usize * header.height as usize * 3;
        let mut frames = Vec::new();

        for _ in 0..header.frame_count {
            let frame_number = read_u32(&mut reader).context("Truncated frame record")?;
            let _timestamp_ms = read_u64(&mut reader).context("Truncated frame record")?;
            let payload_size = read_u32(&mut reader).context("Truncated frame record")? as usize;

            if payload_size != expected_payload {
                bail!(
                    "Frame {} payload size {} does not match {}x{} RGB24",
                    frame_number,
                    payload_size,
                    header.width,
                    header.height
                );
            }

            let wanted = indices.map_or(true, |idx| idx.contains(&frame_number));
            if wanted {
                let mut rgb = vec![0u8; payload_size];
                reader
                    .read_exact(&mut rgb)
                    .with_context(|| format!("Truncated payload for frame {}", frame_number))?;
                frames.push(VideoFrame {
                    number: frame_number,
                    rgb,
                    width: header.width,
                    height: header.height,
                });
            } else {
                // Skip without allocating the payload
                std::io::copy(
                    &mut reader.by_ref().take(payload_size as u64),
                    &mut std::io::sink(),
                )
                .with_context(|| format!("Truncated payload for frame {}", frame_number))?;
            }
        }

        Ok(frames)
    }
}
