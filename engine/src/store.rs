//! Corpus store facade
//!
//! Thin bundle of chunker + embedder + HNSW index + pipeline coordinators:
//! text goes in, a queryable index plus a frame-per-chunk container come
//! out. Chunk IDs double as frame numbers, so a search hit maps straight to
//! the frames that hold its text.

use crate::config::KividConfig;
use crate::embeddings::EmbeddingProvider;
use crate::media::{
    EncodingParams, KvidDecoder, KvidEncoder, QrCodeGenerator, QrOptions, RqrrQrDecoder,
};
use crate::pipeline::{BuildReport, DecodeCoordinator, EncodeCoordinator};
use crate::text::TextChunker;
use crate::vector::{HnswIndex, KernelFactory, VectorIndex};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One search hit with enough context to display or re-fetch the chunk.
#[derive(Debug, Clone, Serialize)]
pub struct StoreHit {
    /// Chunk ID in the index
    pub id: u64,
    pub similarity: f32,
    pub distance: f32,
    /// Frame holding this chunk in the encoded container
    pub frame_number: u32,
    /// Chunk text from the in-memory ledger
    pub content: String,
}

/// Bundles the full ingest/query pipeline behind two calls.
pub struct CorpusStore {
    embedder: Box<dyn EmbeddingProvider>,
    index: HnswIndex,
    encoder: EncodeCoordinator,
    decoder: DecodeCoordinator,
    params: EncodingParams,
    /// Frame number -> chunk content, for search-time display
    contents: Vec<String>,
}

impl CorpusStore {
    /// Wire up the default component stack from configuration.
    pub fn new(config: &KividConfig, embedder: Box<dyn EmbeddingProvider>) -> Result<Self> {
        let chunker = TextChunker::new(
            config.chunking.chunk_size,
            config.chunking.overlap_size,
            config.chunking.preserve_sentences,
        )?;

        let kernel = KernelFactory::new(config.hnsw.metric, embedder.dimension());
        let index = HnswIndex::new(kernel, config.hnsw.to_params());

        let encoder = EncodeCoordinator::new(
            chunker,
            Box::new(QrCodeGenerator::new()),
            Box::new(KvidEncoder::new()),
            QrOptions {
                version: config.video.qr_version,
                ecc: config.video.ecc,
            },
        );
        let decoder =
            DecodeCoordinator::new(Box::new(KvidDecoder::new()), Box::new(RqrrQrDecoder::new()));

        Ok(Self {
            embedder,
            index,
            encoder,
            decoder,
            params: EncodingParams {
                width: config.video.width,
                height: config.video.height,
                fps: config.video.fps,
            },
            contents: Vec::new(),
        })
    }

    /// Chunk, embed, and index `text`; the chunks also join the frame
    /// buffer. Returns the number of chunks added.
    pub fn add_text(&mut self, text: &str) -> Result<usize> {
        let first = self.encoder.chunks().len();
        let added = self.encoder.add_message(text);

        for frame in first..first + added {
            let content = self.encoder.chunks()[frame].content.clone();
            let embedding = self.embedder.embed(&content)?;
            self.index.add(frame as u64, &embedding)?;
            self.contents.push(content);
        }

        info!(chunks = added, total = self.contents.len(), "ingested text");
        Ok(added)
    }

    /// Encode every buffered chunk into the container at `path`.
    pub fn build_video(&mut self, path: &Path) -> Result<BuildReport> {
        let params = self.params.clone();
        self.encoder.build_video(path, &params)
    }

    /// Semantic search over ingested chunks.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<StoreHit>> {
        let embedding = self.embedder.embed(query)?;
        let results = self.index.search(&embedding, k)?;

        Ok(results
            .into_iter()
            .map(|r| StoreHit {
                id: r.id,
                similarity: r.similarity,
                distance: r.distance,
                frame_number: r.id as u32,
                content: self.contents[r.id as usize].clone(),
            })
            .collect())
    }

    /// Decode the frames behind `hits` from the container at `path`.
    pub fn retrieve(&self, path: &Path, hits: &[StoreHit]) -> Result<Vec<String>> {
        let frames: Vec<u32> = hits.iter().map(|h| h.frame_number).collect();
        self.decoder.retrieve_frames(path, Some(&frames))
    }

    pub fn chunk_count(&self) -> usize {
        self.contents.len()
    }

    pub fn index(&self) -> &HnswIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut HnswIndex {
        &mut self.index
    }

    /// Drop every ingested chunk and reset the index and frame buffer.
    pub fn clear(&mut self) {
        self.index.clear();
        self.encoder.clear();
        self.contents.clear();
    }
}
