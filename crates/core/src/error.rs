use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("invalid configuration value for {key}: {details}")]
    InvalidValue { key: String, details: String },

    #[error("index was built with embedding model {indexed} but the service embeds with {configured}")]
    EmbedderMismatch { indexed: String, configured: String },

    #[error("index unavailable: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no documents found under {root} (extension .{extension})")]
    EmptyCorpus { root: PathBuf, extension: String },

    #[error("file is not valid utf-8: {}", .path.display())]
    InvalidUtf8 { path: PathBuf },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("embedding failed during ingestion: {0}")]
    Embedding(#[from] ServiceError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("dimension mismatch at entry {id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        id: u64,
        expected: usize,
        actual: usize,
    },

    #[error("query vector has dimension {actual}, index expects {expected}")]
    QueryDimension { expected: usize, actual: usize },

    #[error("entry {id} has an empty vector")]
    EmptyVector { id: u64 },

    #[error("entry {id} contains a non-finite value")]
    NonFiniteVector { id: u64 },

    #[error("query vector contains a non-finite value")]
    NonFiniteQuery,

    #[error("{} exists and is not an index directory", .0.display())]
    NotAnIndex(PathBuf),

    #[error("index storage is corrupt: {0}")]
    Corruption(String),

    #[error("no index found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("embedding service error: {0}")]
    Embedding(String),

    #[error("synthesis service error: {0}")]
    Synthesis(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("search failed: {0}")]
    Index(#[from] IndexError),

    #[error("question is empty")]
    EmptyQuestion,
}
