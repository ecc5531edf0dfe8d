//! QR adapters over the `qrcode` and `rqrr` crates
//!
//! The generator renders module matrices straight to grayscale with a
//! standard 4-module quiet zone; scaling to frame size happens in the encode
//! coordinator. The decoder runs on luma-converted RGB frames.

use super::{
    EccLevel, QrCapabilities, QrFrameDecoder, QrGenerator, QrImage, QrOptions, VideoFrame,
};
use anyhow::{anyhow, bail, Context, Result};
use qrcode::{EcLevel, QrCode, Version};

/// Quiet-zone width in modules, per the QR specification.
const QUIET_ZONE: usize = 4;

/// Byte-mode capacity of a version-40 symbol per ECC level.
const MAX_CAPACITY_L: usize = 2953;
const MAX_CAPACITY_M: usize = 2331;
const MAX_CAPACITY_Q: usize = 1663;
const MAX_CAPACITY_H: usize = 1273;

fn to_ec_level(ecc: EccLevel) -> EcLevel {
    match ecc {
        EccLevel::Low => EcLevel::L,
        EccLevel::Medium => EcLevel::M,
        EccLevel::Quartile => EcLevel::Q,
        EccLevel::High => EcLevel::H,
    }
}

/// [`QrGenerator`] backed by the pure-Rust `qrcode` crate.
#[derive(Debug, Default)]
pub struct QrCodeGenerator;

impl QrCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl QrGenerator for QrCodeGenerator {
    fn generate(&self, text: &str, options: &QrOptions) -> Result<QrImage> {
        let ec = to_ec_level(options.ecc);

        let code = match options.version {
            Some(v) => {
                if !(1..=40).contains(&v) {
                    bail!("Unsupported QR version {}: expected 1..=40", v);
                }
                QrCode::with_version(text.as_bytes(), Version::Normal(v), ec)
                    .map_err(|e| anyhow!("QR generation failed for version {}: {:?}", v, e))?
            }
            None => QrCode::with_error_correction_level(text.as_bytes(), ec)
                .map_err(|e| anyhow!("QR generation failed: {:?}", e))?,
        };

        let modules = code.width();
        let colors = code.to_colors();
        let side = modules + 2 * QUIET_ZONE;

        // Light background, dark modules
        let mut pixels = vec![255u8; side * side];
        for (i, color) in colors.iter().enumerate() {
            if *color == qrcode::Color::Dark {
                let x = i % modules + QUIET_ZONE;
                let y = i / modules + QUIET_ZONE;
                pixels[y * side + x] = 0;
            }
        }

        Ok(QrImage {
            width: side,
            height: side,
            pixels,
        })
    }

    fn capabilities(&self) -> QrCapabilities {
        QrCapabilities {
            max_data_capacity: MAX_CAPACITY_L,
            supported_versions: 1..=40,
            supported_ecc_levels: vec![
                EccLevel::Low,
                EccLevel::Medium,
                EccLevel::Quartile,
                EccLevel::High,
            ],
        }
    }
}

/// Byte-mode payload ceiling for a given ECC level (version 40 symbol).
pub fn capacity_for_ecc(ecc: EccLevel) -> usize {
    match ecc {
        EccLevel::Low => MAX_CAPACITY_L,
        EccLevel::Medium => MAX_CAPACITY_M,
        EccLevel::Quartile => MAX_CAPACITY_Q,
        EccLevel::High => MAX_CAPACITY_H,
    }
}

/// [`QrFrameDecoder`] backed by the pure-Rust `rqrr` detector.
#[derive(Debug, Default)]
pub struct RqrrQrDecoder;

impl RqrrQrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl QrFrameDecoder for RqrrQrDecoder {
    fn decode(&self, frame: &VideoFrame) -> Result<String> {
        let width = frame.width as usize;
        let height = frame.height as usize;
        if frame.rgb.len() != width * height * 3 {
            bail!(
                "Frame {} has {} bytes, expected {} for {}x{} RGB24",
                frame.number,
                frame.rgb.len(),
                width * height * 3,
                width,
                height
            );
        }

        // ITU-R BT.601 luma
        let luma: Vec<u8> = (0..width * height)
            .map(|i| {
                let r = frame.rgb[i * 3] as u32;
                let g = frame.rgb[i * 3 + 1] as u32;
                let b = frame.rgb[i * 3 + 2] as u32;
                ((r * 299 + g * 587 + b * 114) / 1000) as u8
            })
            .collect();

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| luma[y * width + x]);
        let grids = prepared.detect_grids();
        let grid = grids
            .first()
            .with_context(|| format!("No QR code detected in frame {}", frame.number))?;

        let (_meta, content) = grid
            .decode()
            .map_err(|e| anyhow!("QR decode failed on frame {}: {:?}", frame.number, e))?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_to_rgb_frame(image: &QrImage, number: u32) -> VideoFrame {
        let mut rgb = Vec::with_capacity(image.pixels.len() * 3);
        for &p in &image.pixels {
            rgb.extend_from_slice(&[p, p, p]);
        }
        VideoFrame {
            number,
            rgb,
            width: image.width as u32,
            height: image.height as u32,
        }
    }

    #[test]
    fn test_generate_produces_square_image_with_quiet_zone() {
        let generator = QrCodeGenerator::new();
        let image = generator
            .generate("hello", &QrOptions::default())
            .unwrap();

        assert_eq!(image.width, image.height);
        assert_eq!(image.pixels.len(), image.width * image.height);
        // Quiet zone rows must be entirely light
        assert!(image.pixels[..image.width * QUIET_ZONE].iter().all(|&p| p == 255));
        // Some modules must be dark
        assert!(image.pixels.iter().any(|&p| p == 0));
    }

    #[test]
    fn test_generate_rejects_bad_version() {
        let generator = QrCodeGenerator::new();
        let options = QrOptions {
            version: Some(0),
            ecc: EccLevel::Medium,
        };
        assert!(generator.generate("x", &options).is_err());

        let options = QrOptions {
            version: Some(41),
            ecc: EccLevel::Medium,
        };
        assert!(generator.generate("x", &options).is_err());
    }

    #[test]
    fn test_generate_rejects_oversized_payload() {
        let generator = QrCodeGenerator::new();
        let oversized = "x".repeat(MAX_CAPACITY_L + 1);
        assert!(generator.generate(&oversized, &QrOptions::default()).is_err());
    }

    #[test]
    fn test_capacity_ordering() {
        assert!(capacity_for_ecc(EccLevel::Low) > capacity_for_ecc(EccLevel::Medium));
        assert!(capacity_for_ecc(EccLevel::Medium) > capacity_for_ecc(EccLevel::Quartile));
        assert!(capacity_for_ecc(EccLevel::Quartile) > capacity_for_ecc(EccLevel::High));
    }

    #[test]
    fn test_generate_then_decode_round_trip() {
        let generator = QrCodeGenerator::new();
        let decoder = RqrrQrDecoder::new();

        let payload = "The quick brown fox jumps over the lazy dog. 0123456789";
        let image = generator.generate(payload, &QrOptions::default()).unwrap();

        // Scale up 4x so the detector has enough pixels per module
        let scale = 4;
        let side = image.width * scale;
        let mut rgb = vec![0u8; side * side * 3];
        for y in 0..side {
            for x in 0..side {
                let v = image.pixels[(y / scale) * image.width + (x / scale)];
                let o = (y * side + x) * 3;
                rgb[o] = v;
                rgb[o + 1] = v;
                rgb[o + 2] = v;
            }
        }

        let frame = VideoFrame {
            number: 0,
            rgb,
            width: side as u32,
            height: side as u32,
        };

        let decoded = decoder.decode(&frame).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_decode_rejects_malformed_frame() {
        let decoder = RqrrQrDecoder::new();
        let frame = VideoFrame {
            number: 7,
            rgb: vec![0u8; 10],
            width: 16,
            height: 16,
        };
        assert!(decoder.decode(&frame).is_err());
    }

    #[test]
    fn test_decode_blank_frame_is_error_not_panic() {
        let decoder = RqrrQrDecoder::new();
        let image = QrImage {
            width: 64,
            height: 64,
            pixels: vec![255u8; 64 * 64],
        };
        let frame = gray_to_rgb_frame(&image, 1);
        assert!(decoder.decode(&frame).is_err());
    }
}
