//! Kivid - text corpora stored as video, retrieved semantically
//!
//! Text is split into bounded chunks; each chunk is rendered as a QR code
//! and becomes one frame of a container, while its embedding lands in an
//! on-disk HNSW index. A natural-language query maps back through the index
//! to chunk IDs, frame indices, and finally decoded text.

// ===== Core modules =====

// Configuration management: TOML/env parsing, validation
pub mod config;

// Text embedding providers (pluggable; hash-based placeholder shipped)
pub mod embeddings;

// Media collaborators: QR adapters and the KVID container
pub mod media;

// Encode/decode pipeline coordinators
pub mod pipeline;

// Corpus store facade: chunker + embedder + index + pipeline
pub mod store;

// Sentence-aware text chunking
pub mod text;

// Vector search: kernels, storage, HNSW and flat indexes
pub mod vector;

// ===== Public API =====

// Configuration components
pub use config::{
    ChunkingConfig, DistanceMetric, EmbeddingConfig, HnswConfig, KividConfig, LogFormat, LogLevel,
    LoggingConfig, VideoConfig,
};

// Embedding components
pub use embeddings::{EmbeddingProvider, HashEmbedding};

// Media components
pub use media::{
    EccLevel, EncodingParams, EncodingStats, KvidDecoder, KvidEncoder, QrCapabilities,
    QrCodeGenerator, QrFrameDecoder, QrGenerator, QrImage, QrOptions, RqrrQrDecoder, VideoDecoder,
    VideoEncoder, VideoFrame, VideoInfo,
};

// Pipeline components
pub use pipeline::{BuildReport, CoordinatorStats, DecodeCoordinator, EncodeCoordinator, EncodeState};

// Store facade
pub use store::{CorpusStore, StoreHit};

// Text chunking components
pub use text::{Chunk, TextChunker};

// Vector search components
pub use vector::{
    FlatIndex, HnswIndex, HnswParams, IndexStats, KernelFactory, SearchResult, SimilarityKernel,
    VectorIndex, VectorStorage,
};
