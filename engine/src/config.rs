// engine/src/config.rs
//
// Configuration Management Module
//
// Priority order (highest to lowest):
// 1. Environment variables (KIVID__* prefix)
// 2. Config file (TOML/YAML/JSON)
// 3. Built-in defaults
//
// Design principles:
// - Sensible defaults (works out of the box)
// - Type-safe enums instead of strings
// - Clear validation errors
// - Optional config file (for ease of use)

use crate::media::EccLevel;
use crate::vector::hnsw::HnswParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Main Configuration Structure
// ============================================================================

/// Complete engine configuration with all tunable parameters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct KividConfig {
    /// HNSW index configuration (semantic search backend)
    pub hnsw: HnswConfig,

    /// Text chunking configuration
    pub chunking: ChunkingConfig,

    /// Video container and QR rendering configuration
    pub video: VideoConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

// ============================================================================
// Distance Metric
// ============================================================================

/// Similarity metric used by the vector indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    DotProduct,
    Euclidean,
}

// ============================================================================
// HNSW Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HnswConfig {
    /// Per-layer neighbor budget (layer 0 allows 2*m)
    pub m: usize,

    /// Beam width during graph construction
    pub ef_construction: usize,

    /// Beam width during search; defaults to ef_construction when unset
    pub ef_search: Option<usize>,

    /// Layer-assignment multiplier
    pub ml: f64,

    /// Seed for the layer-assignment RNG
    pub seed: u64,

    /// Similarity metric
    pub metric: DistanceMetric,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: None,
            ml: 1.0 / std::f64::consts::LN_2,
            seed: 42,
            metric: DistanceMetric::Cosine,
        }
    }
}

impl HnswConfig {
    pub fn to_params(&self) -> HnswParams {
        HnswParams {
            m: self.m,
            ef_construction: self.ef_construction,
            ef_search: self.ef_search,
            ml: self.ml,
            seed: self.seed,
        }
    }
}

// ============================================================================
// Chunking Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkingConfig {
    /// Proposed chunk length in chars (sentence preservation may stretch to 1.5x)
    pub chunk_size: usize,

    /// Chars of chunk tail carried into the next chunk's head
    pub overlap_size: usize,

    /// Prefer ending chunks at sentence boundaries
    pub preserve_sentences: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            overlap_size: 64,
            preserve_sentences: true,
        }
    }
}

// ============================================================================
// Video Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Frames per second recorded in the container header
    pub fps: u32,

    /// Fixed QR version (1..=40); unset picks the smallest that fits
    pub qr_version: Option<i16>,

    /// QR error-correction level
    pub ecc: EccLevel,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            fps: 30,
            qr_version: None,
            ecc: EccLevel::Medium,
        }
    }
}

// ============================================================================
// Embedding Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Dimension of the embedding vectors (and of both indexes)
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: LogLevel,

    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

// ============================================================================
// Loading and Validation
// ============================================================================

impl KividConfig {
    /// Load configuration with priority chain:
    /// 1. Environment variables (KIVID__*)
    /// 2. Config file (if provided)
    /// 3. Built-in defaults
    pub fn load(config_file: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Start with defaults (converted to config source)
        let defaults = Self::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize defaults")?;
        builder = builder.add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // Add config file if provided
        if let Some(path) = config_file {
            builder = builder.add_source(
                config::File::with_name(path).required(false), // Don't fail if file doesn't exist
            );
        }

        // Add environment variables (highest priority)
        builder = builder.add_source(
            config::Environment::with_prefix("KIVID")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().context("Failed to build config")?;

        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize config")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        // HNSW validation
        anyhow::ensure!(self.hnsw.m > 0, "hnsw.m must be > 0, got {}", self.hnsw.m);
        anyhow::ensure!(
            self.hnsw.ef_construction > 0,
            "hnsw.ef_construction must be > 0, got {}",
            self.hnsw.ef_construction
        );
        if let Some(ef_search) = self.hnsw.ef_search {
            anyhow::ensure!(ef_search > 0, "hnsw.ef_search must be > 0 when set");
        }
        anyhow::ensure!(
            self.hnsw.ml.is_finite() && self.hnsw.ml > 0.0,
            "hnsw.ml must be a positive finite number, got {}",
            self.hnsw.ml
        );

        // Chunking validation
        anyhow::ensure!(
            self.chunking.chunk_size > 0,
            "chunking.chunk_size must be > 0"
        );
        anyhow::ensure!(
            self.chunking.overlap_size < self.chunking.chunk_size,
            "chunking.overlap_size ({}) must be smaller than chunk_size ({})",
            self.chunking.overlap_size,
            self.chunking.chunk_size
        );

        // Video validation
        anyhow::ensure!(
            self.video.width > 0 && self.video.height > 0,
            "video dimensions must be non-zero, got {}x{}",
            self.video.width,
            self.video.height
        );
        anyhow::ensure!(self.video.fps > 0, "video.fps must be > 0");
        if let Some(version) = self.video.qr_version {
            anyhow::ensure!(
                (1..=40).contains(&version),
                "video.qr_version must be in 1..=40, got {}",
                version
            );
        }

        // Embedding validation
        anyhow::ensure!(
            self.embedding.dimension > 0,
            "embedding.dimension must be > 0"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = KividConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hnsw.m, 16);
        assert_eq!(config.hnsw.ef_construction, 200);
        assert_eq!(config.chunking.chunk_size, 512);
        assert_eq!(config.video.fps, 30);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = KividConfig::load(None).unwrap();
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.video.ecc, EccLevel::Medium);
    }

    #[test]
    fn test_invalid_hnsw_rejected() {
        let mut config = KividConfig::default();
        config.hnsw.m = 0;
        assert!(config.validate().is_err());

        let mut config = KividConfig::default();
        config.hnsw.ml = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_chunking_rejected() {
        let mut config = KividConfig::default();
        config.chunking.overlap_size = config.chunking.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_qr_version_rejected() {
        let mut config = KividConfig::default();
        config.video.qr_version = Some(41);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = KividConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: KividConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.hnsw.seed, config.hnsw.seed);
        assert_eq!(parsed.chunking.chunk_size, config.chunking.chunk_size);
    }

    #[test]
    fn test_to_params_carries_all_fields() {
        let mut config = HnswConfig::default();
        config.ef_search = Some(64);
        let params = config.to_params();
        assert_eq!(params.m, 16);
        assert_eq!(params.ef_search, Some(64));
        assert_eq!(params.seed, 42);
    }
}
