use clap::{Parser, Subcommand};
use earnings_embed::{EmbedConfig, FastEmbedProvider};
use earnings_retriever::{
    ingest::{IngestConfig, IngestEngine},
    query::{GroundingContext, MetadataFilter, RetrievalRequest, Retriever},
    storage::meta::DEFAULT_COLLECTION,
    storage::sqlite_store::{SqliteStore, TranscriptIndex},
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// A CLI tool to build and query the earnings-call transcript index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base directory containing the .earnings-rag.db database file
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    /// Directory where embedding model files are cached
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Embedding model to use (must match between ingest and query)
    #[arg(long, default_value = "all-minilm-l6-v2")]
    model: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize the transcript index database
    Init,
    /// Ingest a directory of transcript JSON documents
    Ingest {
        /// Directory containing *.json transcript documents
        transcripts_dir: PathBuf,
        /// Collection name recorded in the index
        #[arg(long, default_value = DEFAULT_COLLECTION)]
        collection: String,
        /// Maximum chunk size in bytes
        #[arg(long, default_value_t = 1000)]
        chunk_size: usize,
        /// Overlap between consecutive chunks in bytes
        #[arg(long, default_value_t = 200)]
        chunk_overlap: usize,
    },
    /// Retrieve grounding context for a question
    Query {
        /// The question to search for
        query: String,
        /// Restrict to a company ticker (e.g. RIVN)
        #[arg(short, long)]
        ticker: Option<String>,
        /// Restrict to a fiscal quarter (e.g. Q4)
        #[arg(short, long)]
        quarter: Option<String>,
        /// Restrict to a fiscal year (e.g. 2025)
        #[arg(short, long)]
        year: Option<i64>,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
        /// Minimum similarity score (0.0 to 1.0)
        #[arg(long)]
        threshold: Option<f32>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show index statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let models_dir = args
        .models_dir
        .clone()
        .unwrap_or_else(|| args.base_dir.join(".models"));

    match args.command {
        Commands::Init => {
            let _index = TranscriptIndex::open(&args.base_dir).await?;
            println!("Initialized transcript index at {}", args.base_dir.display());
            println!(
                "Database location: {}/.earnings-rag.db",
                args.base_dir.display()
            );
            Ok(())
        }
        Commands::Ingest {
            transcripts_dir,
            collection,
            chunk_size,
            chunk_overlap,
        } => {
            let index = TranscriptIndex::open(&args.base_dir).await?;
            let provider = Arc::new(
                FastEmbedProvider::create(
                    EmbedConfig::new(&models_dir, &args.model),
                )
                .await?,
            );

            let config = IngestConfig::new(collection)
                .with_chunk_size(chunk_size)
                .with_chunk_overlap(chunk_overlap);
            let engine = IngestEngine::new(config, index, provider);

            let report = engine.ingest_directory(&transcripts_dir).await?;
            println!("Ingestion complete:");
            println!("  Documents loaded: {}", report.documents_loaded);
            println!("  Documents skipped: {}", report.documents_skipped);
            println!("  Chunks written: {}", report.chunks_written);
            println!("  Embeddings generated: {}", report.embeddings_generated);
            Ok(())
        }
        Commands::Query {
            query,
            ticker,
            quarter,
            year,
            limit,
            threshold,
            format,
        } => {
            let index = TranscriptIndex::open(&args.base_dir).await?;
            let store = Arc::new(SqliteStore::new(index));
            let provider = Arc::new(
                FastEmbedProvider::create(
                    EmbedConfig::new(&models_dir, &args.model),
                )
                .await?,
            );

            let mut retriever = Retriever::new(store, provider).with_top_k(limit);
            if let Some(threshold) = threshold {
                retriever = retriever.with_threshold(threshold);
            }

            let request = RetrievalRequest {
                query,
                ticker,
                quarter,
                year,
            };
            let result = retriever.retrieve(&request).await?;
            let grounding = GroundingContext::from_result(result);

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&grounding)?);
                }
                OutputFormat::Summary => {
                    println!("{}", grounding.context);
                    if !grounding.matches.is_empty() {
                        println!();
                        println!("Matches:");
                        for chunk in &grounding.matches {
                            println!(
                                "  Score: {:.3} | Source: {} | Offset: {}",
                                chunk.score, chunk.source, chunk.start_offset
                            );
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Stats { format } => {
            let index = TranscriptIndex::open(&args.base_dir).await?;
            let stats = index.stats().await?;
            let collection = index.get_collection_metadata(DEFAULT_COLLECTION).await?;
            let chunk_metadata = index.list_chunks(&MetadataFilter::default()).await?;
            let sources: std::collections::BTreeSet<String> = chunk_metadata
                .iter()
                .map(|c| c.source.clone())
                .collect();

            match format {
                OutputFormat::Json => {
                    #[derive(serde::Serialize)]
                    struct StatsOutput {
                        stats: earnings_retriever::storage::sqlite_store::IndexStats,
                        collection:
                            Option<earnings_retriever::storage::meta::CollectionMetadata>,
                        sources: Vec<String>,
                    }
                    let output = StatsOutput {
                        stats,
                        collection,
                        sources: sources.into_iter().collect(),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => {
                    println!("Index statistics:");
                    println!("  Transcripts: {}", stats.transcripts);
                    println!("  Chunks: {}", stats.chunks);
                    println!("  Chunks with embeddings: {}", stats.chunks_with_embeddings);
                    if let Some(collection) = collection {
                        println!("  Collection: {}", collection.collection);
                        if let Some(model_id) = collection.model_id {
                            println!("  Embedding model: {model_id}");
                        }
                    }
                    if !sources.is_empty() {
                        println!("  Sources:");
                        for source in sources.iter().take(10) {
                            println!("    {source}");
                        }
                        if sources.len() > 10 {
                            println!("    ... and {} more", sources.len() - 10);
                        }
                    }
                }
            }
            Ok(())
        }
    }
}
