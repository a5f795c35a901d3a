use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use corpus_qa_core::chunking::{DEFAULT_CHUNK_MAX_CHARS, DEFAULT_CHUNK_OVERLAP_CHARS};
use corpus_qa_core::models::{DEFAULT_EMBED_CONCURRENCY, DEFAULT_TEXT_EXTENSION};
use corpus_qa_core::{
    build_and_persist, check_embedder, cited_sources, CharacterNgramEmbedder, ChunkingConfig,
    Embedder, GeminiClient, IngestionOptions, ProviderConfig, QaService, Query, Retriever,
    VectorIndex, DEFAULT_TOP_K,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "corpus-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the persisted vector index
    #[arg(long, global = true, env = "CORPUS_QA_INDEX", default_value = "corpus_index")]
    index: PathBuf,

    /// Embedding backend for chunks and questions; must match the one used at ingestion
    #[arg(long, global = true, value_enum, default_value_t = EmbedderKind::Gemini)]
    embedder: EmbedderKind,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Hosted Gemini embeddings (needs GOOGLE_API_KEY)
    Gemini,
    /// Offline character trigram embeddings
    Ngram,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and index every text file under a corpus folder.
    Ingest {
        /// Folder that contains the text files, searched recursively.
        #[arg(long, env = "CORPUS_QA_CORPUS", default_value = "Corpus")]
        corpus: PathBuf,
        /// Maximum characters per chunk.
        #[arg(long, default_value_t = DEFAULT_CHUNK_MAX_CHARS)]
        chunk_size: usize,
        /// Characters repeated between consecutive chunks.
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP_CHARS)]
        chunk_overlap: usize,
        /// File extension recognized as corpus text.
        #[arg(long, default_value = DEFAULT_TEXT_EXTENSION)]
        extension: String,
        /// Embedding requests kept in flight.
        #[arg(long, default_value_t = DEFAULT_EMBED_CONCURRENCY)]
        concurrency: usize,
    },
    /// Answer a question from the index and print the answer with its source.
    Ask {
        /// Question to answer
        #[arg(long)]
        question: String,
        /// Advisory category, e.g. the text the question is about.
        #[arg(long, default_value = "")]
        mode: String,
        /// Number of passages given to the model.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Show the passages a question retrieves, without synthesizing an answer.
    Search {
        /// Question to search for
        #[arg(long)]
        question: String,
        /// Number of passages to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Characters of each passage to print.
        #[arg(long, default_value_t = 300)]
        preview_chars: usize,
    },
}

fn gemini_client() -> anyhow::Result<Arc<GeminiClient>> {
    let config = ProviderConfig::from_env().context("provider configuration")?;
    let client = GeminiClient::new(config).context("building gemini client")?;
    Ok(Arc::new(client))
}

fn offline_embedder() -> Arc<dyn Embedder> {
    Arc::new(CharacterNgramEmbedder::default())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            return Err(error).context("reading .env");
        }
    }

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "corpus-qa boot"
    );

    match cli.command {
        Command::Ingest {
            corpus,
            chunk_size,
            chunk_overlap,
            extension,
            concurrency,
        } => {
            let embedder: Arc<dyn Embedder> = match cli.embedder {
                EmbedderKind::Gemini => gemini_client()? as Arc<dyn Embedder>,
                EmbedderKind::Ngram => offline_embedder(),
            };
            let options = IngestionOptions {
                chunking: ChunkingConfig {
                    max_chars: chunk_size,
                    overlap_chars: chunk_overlap,
                },
                text_extension: extension,
                embed_concurrency: concurrency,
            };

            info!(corpus = %corpus.display(), index = %cli.index.display(), "ingesting corpus");
            let report = build_and_persist(&corpus, &cli.index, &options, embedder.as_ref())
                .await
                .with_context(|| format!("ingesting {}", corpus.display()))?;

            println!(
                "{} documents, {} chunks indexed into {} at {}",
                report.document_count,
                report.chunk_count,
                cli.index.display(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask {
            question,
            mode,
            top_k,
        } => {
            let client = gemini_client()?;
            let embedder: Arc<dyn Embedder> = match cli.embedder {
                EmbedderKind::Gemini => client.clone() as Arc<dyn Embedder>,
                EmbedderKind::Ngram => offline_embedder(),
            };
            let service = QaService::open(&cli.index, embedder, client)
                .with_context(|| format!("opening index {}", cli.index.display()))?
                .with_top_k(top_k);

            let answer = service.answer(&Query { question, mode }).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Command::Search {
            question,
            top_k,
            preview_chars,
        } => {
            if question.trim().is_empty() {
                bail!("question is empty");
            }
            let embedder: Arc<dyn Embedder> = match cli.embedder {
                EmbedderKind::Gemini => gemini_client()? as Arc<dyn Embedder>,
                EmbedderKind::Ngram => offline_embedder(),
            };
            let index = VectorIndex::load(&cli.index)
                .with_context(|| format!("opening index {}", cli.index.display()))?;
            check_embedder(&index, embedder.as_ref())?;

            let retriever = Retriever::new(embedder, Arc::new(index)).with_top_k(top_k);
            let hits = retriever.retrieve(&question).await?;
            if hits.is_empty() {
                warn!("index returned no passages");
            }

            println!("question: {question}");
            for (rank, hit) in hits.iter().enumerate() {
                let source = hit.metadata.source_id.as_deref().unwrap_or("-");
                println!("[{}] score={:.4} id={} source={}", rank + 1, hit.score, hit.id, source);
                let preview: String = hit.metadata.text.chars().take(preview_chars).collect();
                let ellipsis = if hit.metadata.text.chars().count() > preview_chars {
                    "..."
                } else {
                    ""
                };
                println!("  {preview}{ellipsis}");
            }
            println!("sources: {}", cited_sources(&hits).join(", "));
        }
    }

    Ok(())
}
