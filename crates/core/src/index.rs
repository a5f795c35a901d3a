use crate::error::IndexError;
use crate::models::{EntryMetadata, IndexEntry, SearchHit};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_TOP_K: usize = 4;
pub const MANIFEST_FILE: &str = "manifest.json";
pub const ENTRIES_FILE: &str = "entries.json";

const FORMAT_VERSION: u32 = 1;
const METRIC: &str = "cosine";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    index_id: Uuid,
    metric: String,
    dimension: usize,
    entry_count: usize,
    embedding_model: String,
    created_at: DateTime<Utc>,
    entries_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: u64,
    vector: String,
    metadata: EntryMetadata,
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    index_id: Uuid,
    dimension: usize,
    embedding_model: String,
    created_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
    norms: Vec<f32>,
}

impl VectorIndex {
    pub fn build(items: Vec<(Vec<f32>, EntryMetadata)>) -> Result<Self, IndexError> {
        let mut entries = Vec::with_capacity(items.len());
        let mut dimension = 0;

        for (position, (vector, metadata)) in items.into_iter().enumerate() {
            let id = position as u64;
            if vector.is_empty() {
                return Err(IndexError::EmptyVector { id });
            }
            if position == 0 {
                dimension = vector.len();
            } else if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    id,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|value| !value.is_finite()) {
                return Err(IndexError::NonFiniteVector { id });
            }
            entries.push(IndexEntry {
                id,
                vector,
                metadata,
            });
        }

        Ok(Self::from_parts(
            Uuid::new_v4(),
            dimension,
            String::new(),
            Utc::now(),
            entries,
        ))
    }

    pub fn with_embedding_model(mut self, model_id: impl Into<String>) -> Self {
        self.embedding_model = model_id.into();
        self
    }

    fn from_parts(
        index_id: Uuid,
        dimension: usize,
        embedding_model: String,
        created_at: DateTime<Utc>,
        entries: Vec<IndexEntry>,
    ) -> Self {
        let norms = entries.iter().map(|entry| norm(&entry.vector)).collect();
        Self {
            index_id,
            dimension,
            embedding_model,
            created_at,
            entries,
            norms,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn index_id(&self) -> Uuid {
        self.index_id
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn get(&self, id: u64) -> Option<&IndexEntry> {
        usize::try_from(id).ok().and_then(|position| self.entries.get(position))
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if query.iter().any(|value| !value.is_finite()) {
            return Err(IndexError::NonFiniteQuery);
        }

        let query_norm = norm(query);
        let mut scored: Vec<(f32, usize)> = self
            .entries
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(position, (entry, entry_norm))| {
                (cosine(query, query_norm, &entry.vector, *entry_norm), position)
            })
            .collect();

        scored.sort_by(|left, right| right.0.total_cmp(&left.0).then(left.1.cmp(&right.1)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, position)| {
                let entry = &self.entries[position];
                SearchHit {
                    id: entry.id,
                    score,
                    metadata: entry.metadata.clone(),
                }
            })
            .collect())
    }

    /// Writes the index to `dir`, replacing a previous index there. A failure
    /// at any step leaves the previous index in place.
    pub fn persist(&self, dir: &Path) -> Result<(), IndexError> {
        let name = dir
            .file_name()
            .ok_or_else(|| IndexError::NotAnIndex(dir.to_path_buf()))?;

        if dir.exists() && !dir.join(MANIFEST_FILE).is_file() && !is_empty_dir(dir)? {
            return Err(IndexError::NotAnIndex(dir.to_path_buf()));
        }

        let parent = dir.parent().filter(|parent| !parent.as_os_str().is_empty());
        if let Some(parent) = parent {
            fs::create_dir_all(parent)?;
        }

        let staging = dir.with_file_name(format!(
            ".{}.staging-{}",
            name.to_string_lossy(),
            Uuid::new_v4()
        ));
        fs::create_dir(&staging)?;

        if let Err(error) = self.write_files(&staging) {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(path = %staging.display(), error = %cleanup, "failed to remove staging dir");
            }
            return Err(error);
        }

        if dir.exists() {
            let previous = dir.with_file_name(format!(
                ".{}.previous-{}",
                name.to_string_lossy(),
                Uuid::new_v4()
            ));
            fs::rename(dir, &previous)?;
            if let Err(error) = fs::rename(&staging, dir) {
                fs::rename(&previous, dir)?;
                if let Err(cleanup) = fs::remove_dir_all(&staging) {
                    warn!(path = %staging.display(), error = %cleanup, "failed to remove staging dir");
                }
                return Err(error.into());
            }
            if let Err(cleanup) = fs::remove_dir_all(&previous) {
                warn!(path = %previous.display(), error = %cleanup, "failed to remove replaced index");
            }
        } else {
            fs::rename(&staging, dir)?;
        }

        info!(
            path = %dir.display(),
            index_id = %self.index_id,
            entries = self.entries.len(),
            dimension = self.dimension,
            "persisted vector index"
        );
        Ok(())
    }

    fn write_files(&self, target: &Path) -> Result<(), IndexError> {
        let stored: Vec<StoredEntry> = self
            .entries
            .iter()
            .map(|entry| StoredEntry {
                id: entry.id,
                vector: encode_vector(&entry.vector),
                metadata: entry.metadata.clone(),
            })
            .collect();
        let entries_json = serde_json::to_vec(&stored)?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            index_id: self.index_id,
            metric: METRIC.to_string(),
            dimension: self.dimension,
            entry_count: self.entries.len(),
            embedding_model: self.embedding_model.clone(),
            created_at: self.created_at,
            entries_sha256: sha256_hex(&entries_json),
        };

        fs::write(target.join(ENTRIES_FILE), &entries_json)?;
        fs::write(
            target.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(IndexError::NotFound(dir.to_path_buf()));
        }

        let manifest: Manifest = serde_json::from_slice(&fs::read(&manifest_path)?)
            .map_err(|error| IndexError::Corruption(format!("unreadable manifest: {error}")))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(IndexError::Corruption(format!(
                "unsupported format version {}",
                manifest.format_version
            )));
        }
        if manifest.metric != METRIC {
            return Err(IndexError::Corruption(format!(
                "unsupported metric {}",
                manifest.metric
            )));
        }

        let entries_path = dir.join(ENTRIES_FILE);
        let entries_json = fs::read(&entries_path).map_err(|error| {
            IndexError::Corruption(format!("{}: {error}", entries_path.display()))
        })?;

        if sha256_hex(&entries_json) != manifest.entries_sha256 {
            return Err(IndexError::Corruption(
                "entries checksum does not match manifest".to_string(),
            ));
        }

        let stored: Vec<StoredEntry> = serde_json::from_slice(&entries_json)
            .map_err(|error| IndexError::Corruption(format!("unreadable entries: {error}")))?;

        if stored.len() != manifest.entry_count {
            return Err(IndexError::Corruption(format!(
                "manifest lists {} entries, found {}",
                manifest.entry_count,
                stored.len()
            )));
        }

        let mut entries = Vec::with_capacity(stored.len());
        for (position, item) in stored.into_iter().enumerate() {
            if item.id != position as u64 {
                return Err(IndexError::Corruption(format!(
                    "entry at position {position} has id {}",
                    item.id
                )));
            }
            let vector = decode_vector(&item.vector)
                .map_err(|details| IndexError::Corruption(format!("entry {}: {details}", item.id)))?;
            if vector.len() != manifest.dimension {
                return Err(IndexError::DimensionMismatch {
                    id: item.id,
                    expected: manifest.dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|value| !value.is_finite()) {
                return Err(IndexError::NonFiniteVector { id: item.id });
            }
            entries.push(IndexEntry {
                id: item.id,
                vector,
                metadata: item.metadata,
            });
        }

        debug!(path = %dir.display(), entries = entries.len(), "decoded index entries");
        info!(
            path = %dir.display(),
            index_id = %manifest.index_id,
            entries = entries.len(),
            dimension = manifest.dimension,
            embedding_model = %manifest.embedding_model,
            "loaded vector index"
        );

        Ok(Self::from_parts(
            manifest.index_id,
            manifest.dimension,
            manifest.embedding_model,
            manifest.created_at,
            entries,
        ))
    }
}

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

fn cosine(query: &[f32], query_norm: f32, vector: &[f32], vector_norm: f32) -> f32 {
    if query_norm == 0.0 || vector_norm == 0.0 {
        return 0.0;
    }
    let dot = query
        .iter()
        .zip(vector)
        .map(|(left, right)| left * right)
        .sum::<f32>();
    dot / (query_norm * vector_norm)
}

fn encode_vector(vector: &[f32]) -> String {
    let bytes: Vec<u8> = vector.iter().flat_map(|value| value.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

fn decode_vector(encoded: &str) -> Result<Vec<f32>, String> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|error| format!("invalid base64 vector: {error}"))?;
    if bytes.len() % 4 != 0 {
        return Err(format!("vector byte length {} is not a multiple of 4", bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|word| f32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn is_empty_dir(dir: &Path) -> Result<bool, IndexError> {
    Ok(fs::read_dir(dir)?.next().is_none())
}
