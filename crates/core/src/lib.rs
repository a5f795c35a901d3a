pub mod chunking;
pub mod citation;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod models;
pub mod prompt;
pub mod providers;
pub mod retriever;
pub mod service;
pub mod synthesizer;

pub use chunking::{chunk_document, split_text, ChunkText, ChunkingConfig, Delimiter, DEFAULT_DELIMITERS};
pub use citation::{cited_sources, extract_citation, UNKNOWN_SOURCE};
pub use config::ProviderConfig;
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{ConfigError, IndexError, IngestError, ServiceError};
pub use index::{VectorIndex, DEFAULT_TOP_K};
pub use ingest::{build_and_persist, chunk_documents, embed_chunks, ingest_corpus, IngestionReport};
pub use loader::{discover_text_files, load_corpus};
pub use models::{
    Answer, Chunk, Document, EntryMetadata, IndexEntry, IngestionOptions, Query, SearchHit,
};
pub use prompt::{assemble_prompt, FALLBACK_ANSWER};
pub use providers::GeminiClient;
pub use retriever::Retriever;
pub use service::{check_embedder, QaService};
pub use synthesizer::Synthesizer;
