//! Kivid command-line tool
//!
//! Encode text corpora into a frame-per-chunk container, build and query
//! the HNSW index, and decode containers back to text.
//!
//! # Usage
//! ```bash
//! # Encode a text file into a container (and an index next to it)
//! kivid encode corpus.txt corpus.kvid
//!
//! # Query the index and print the matching chunks
//! kivid search corpus.kvid "how do orchards work" --k 5
//!
//! # Dump every decoded chunk
//! kivid decode corpus.kvid
//!
//! # Container metadata
//! kivid stats corpus.kvid
//!
//! # With verbose logging
//! RUST_LOG=kivid_engine=debug kivid encode corpus.txt corpus.kvid
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kivid_engine::{
    CorpusStore, DecodeCoordinator, HashEmbedding, KvidDecoder, KividConfig, RqrrQrDecoder,
    VideoDecoder,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kivid", version, about = "Store text corpora as video with semantic retrieval")]
struct Cli {
    /// Path to a config file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk a text file, build the index, and encode the container
    Encode {
        /// Input text file
        input: PathBuf,
        /// Output container path
        output: PathBuf,
        /// Optional path for the HNSW index (defaults to <output>.hnsw)
        #[arg(long)]
        index: Option<PathBuf>,
    },
    /// Decode every recoverable chunk from a container
    Decode {
        /// Container path
        input: PathBuf,
    },
    /// Query a previously encoded corpus
    Search {
        /// Container path (its index is expected at <container>.hnsw)
        container: PathBuf,
        /// Natural-language query
        query: String,
        /// Number of results
        #[arg(long, default_value_t = 5)]
        k: usize,
    },
    /// Print container metadata as JSON
    Stats {
        /// Container path
        input: PathBuf,
    },
}

fn init_logging(config: &KividConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kivid_engine={}", config.logging.level.as_str())));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn index_path_for(container: &PathBuf, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        let mut path = container.clone();
        path.set_extension("hnsw");
        path
    })
}

fn build_store(config: &KividConfig) -> Result<CorpusStore> {
    let embedder = HashEmbedding::new(config.embedding.dimension);
    CorpusStore::new(config, Box::new(embedder))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = KividConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Command::Encode { input, output, index } => {
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let mut store = build_store(&config)?;
            let chunks = store.add_text(&text)?;
            let report = store.build_video(&output)?;

            let index_path = index_path_for(&output, index);
            use kivid_engine::VectorIndex;
            store.index().save(&index_path)?;

            info!(chunks, index = %index_path.display(), "encode complete");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Decode { input } => {
            let coordinator = DecodeCoordinator::new(
                Box::new(KvidDecoder::new()),
                Box::new(RqrrQrDecoder::new()),
            );
            let payloads = coordinator.retrieve(&input)?;
            for payload in payloads {
                println!("{}", payload);
            }
        }

        Command::Search { container, query, k } => {
            use kivid_engine::{EmbeddingProvider, HnswIndex, KernelFactory, VectorIndex};

            let index_path = index_path_for(&container, None);
            let kernel = KernelFactory::new(config.hnsw.metric, config.embedding.dimension);
            let mut index = HnswIndex::new(kernel, config.hnsw.to_params());
            index
                .load(&index_path)
                .with_context(|| format!("Failed to load index {}", index_path.display()))?;

            let embedder = HashEmbedding::new(config.embedding.dimension);
            let embedding = embedder.embed(&query)?;
            let hits = index.search(&embedding, k)?;

            // Pull the matching frames back out of the container
            let frames: Vec<u32> = hits.iter().map(|h| h.id as u32).collect();
            let coordinator = DecodeCoordinator::new(
                Box::new(KvidDecoder::new()),
                Box::new(RqrrQrDecoder::new()),
            );
            let decoded = coordinator.retrieve_frames(&container, Some(&frames))?;

            let report = serde_json::json!({
                "hits": hits.iter().map(|h| {
                    serde_json::json!({
                        "id": h.id,
                        "similarity": h.similarity,
                        "distance": h.distance,
                    })
                }).collect::<Vec<_>>(),
                "decoded": decoded,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Stats { input } => {
            let info = KvidDecoder::new().get_info(&input)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
