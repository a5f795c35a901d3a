use crate::chunking::ChunkingConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEXT_EXTENSION: &str = "txt";
pub const DEFAULT_EMBED_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source_id: String,
}

/// A bounded span of one document. The first `overlap` characters repeat the
/// tail of the previous chunk of the same document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub ordinal: usize,
    pub overlap: usize,
}

impl Chunk {
    pub fn body(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((offset, _)) => &self.text[offset..],
            None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EntryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub text: String,
}

impl From<&Chunk> for EntryMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            source_id: Some(chunk.source_id.clone()),
            text: chunk.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: u64,
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub score: f32,
    pub metadata: EntryMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub question: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunking: ChunkingConfig,
    pub text_extension: String,
    pub embed_concurrency: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            text_extension: DEFAULT_TEXT_EXTENSION.to_string(),
            embed_concurrency: DEFAULT_EMBED_CONCURRENCY,
        }
    }
}
