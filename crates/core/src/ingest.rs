use crate::chunking::{chunk_document, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::index::VectorIndex;
use crate::loader::load_corpus;
use crate::{Chunk, Document, EntryMetadata, IngestError, IngestionOptions};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use tracing::info;

pub struct IngestionReport {
    pub document_count: usize,
    pub chunk_count: usize,
    pub index: VectorIndex,
}

pub fn chunk_documents(
    documents: &[Document],
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    let mut chunks = Vec::new();
    for document in documents {
        chunks.extend(chunk_document(document, config)?);
    }
    Ok(chunks)
}

pub async fn embed_chunks<E>(
    chunks: &[Chunk],
    embedder: &E,
    concurrency: usize,
) -> Result<Vec<Vec<f32>>, IngestError>
where
    E: Embedder + ?Sized,
{
    let vectors: Vec<Vec<f32>> = stream::iter(chunks)
        .map(|chunk| embedder.embed(&chunk.text))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;
    Ok(vectors)
}

pub async fn ingest_corpus<E>(
    root: &Path,
    options: &IngestionOptions,
    embedder: &E,
) -> Result<IngestionReport, IngestError>
where
    E: Embedder + ?Sized,
{
    options.chunking.validate()?;

    let documents = load_corpus(root, &options.text_extension)?;
    info!(root = %root.display(), documents = documents.len(), "loaded corpus");

    let chunks = chunk_documents(&documents, options.chunking)?;
    if chunks.is_empty() {
        return Err(IngestError::EmptyCorpus {
            root: root.to_path_buf(),
            extension: options.text_extension.clone(),
        });
    }
    info!(
        chunks = chunks.len(),
        max_chars = options.chunking.max_chars,
        overlap_chars = options.chunking.overlap_chars,
        "split documents into chunks"
    );

    let vectors = embed_chunks(&chunks, embedder, options.embed_concurrency).await?;

    let items = chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| (vector, EntryMetadata::from(chunk)))
        .collect();
    let index = VectorIndex::build(items)?.with_embedding_model(embedder.model_id());
    info!(
        entries = index.len(),
        dimension = index.dimension(),
        model = embedder.model_id(),
        "built vector index"
    );

    Ok(IngestionReport {
        document_count: documents.len(),
        chunk_count: chunks.len(),
        index,
    })
}

/// Runs [`ingest_corpus`] and writes the index to `index_dir` only if every
/// step succeeded.
pub async fn build_and_persist<E>(
    root: &Path,
    index_dir: &Path,
    options: &IngestionOptions,
    embedder: &E,
) -> Result<IngestionReport, IngestError>
where
    E: Embedder + ?Sized,
{
    let report = ingest_corpus(root, options, embedder).await?;
    report.index.persist(index_dir)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CharacterNgramEmbedder, ServiceError};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct FailingEmbedder {
        calls: AtomicUsize,
        fail_at: usize,
    }

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn model_id(&self) -> &str {
            "failing"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ServiceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call >= self.fail_at {
                Err(ServiceError::Embedding("quota exhausted".to_string()))
            } else {
                Ok(vec![1.0, 0.0])
            }
        }
    }

    fn small_chunks() -> IngestionOptions {
        IngestionOptions {
            chunking: ChunkingConfig {
                max_chars: 40,
                overlap_chars: 8,
            },
            ..IngestionOptions::default()
        }
    }

    fn write_corpus(root: &Path) -> std::io::Result<()> {
        fs::create_dir_all(root.join("gita"))?;
        fs::create_dir_all(root.join("ramayana"))?;
        fs::write(
            root.join("gita/chapter1.txt"),
            "Dhritarashtra asked Sanjaya about the field of dharma.\n\nThe armies stood ready on both sides.",
        )?;
        fs::write(
            root.join("ramayana/bala.txt"),
            "Valmiki asked Narada who the most virtuous man alive was. Narada spoke of Rama.",
        )
    }

    #[tokio::test]
    async fn index_has_one_entry_per_chunk() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        write_corpus(dir.path())?;
        let options = small_chunks();

        let documents = load_corpus(dir.path(), "txt")?;
        let expected = chunk_documents(&documents, options.chunking)?;

        let embedder = CharacterNgramEmbedder::default();
        let report = ingest_corpus(dir.path(), &options, &embedder).await?;

        assert_eq!(report.document_count, 2);
        assert_eq!(report.chunk_count, expected.len());
        assert_eq!(report.index.len(), expected.len());
        assert_eq!(report.index.embedding_model(), embedder.model_id());
        for (entry, chunk) in report.index.entries().iter().zip(&expected) {
            assert_eq!(entry.metadata.text, chunk.text);
            assert_eq!(entry.metadata.source_id.as_deref(), Some(chunk.source_id.as_str()));
        }
        Ok(())
    }

    #[tokio::test]
    async fn empty_corpus_writes_no_index() -> Result<(), Box<dyn std::error::Error>> {
        let corpus = tempdir()?;
        let output = tempdir()?;
        let index_dir = output.path().join("index");

        let result = build_and_persist(
            corpus.path(),
            &index_dir,
            &IngestionOptions::default(),
            &CharacterNgramEmbedder::default(),
        )
        .await;

        assert!(matches!(result, Err(IngestError::EmptyCorpus { .. })));
        assert!(!index_dir.exists());
        assert_eq!(fs::read_dir(output.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn corpus_of_empty_files_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let corpus = tempdir()?;
        fs::write(corpus.path().join("blank.txt"), "")?;
        let result = ingest_corpus(
            corpus.path(),
            &IngestionOptions::default(),
            &CharacterNgramEmbedder::default(),
        )
        .await;
        assert!(matches!(result, Err(IngestError::EmptyCorpus { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn embedding_failure_aborts_before_writing() -> Result<(), Box<dyn std::error::Error>> {
        let corpus = tempdir()?;
        write_corpus(corpus.path())?;
        let output = tempdir()?;
        let index_dir = output.path().join("index");
        let embedder = FailingEmbedder {
            calls: AtomicUsize::new(0),
            fail_at: 2,
        };

        let result = build_and_persist(corpus.path(), &index_dir, &small_chunks(), &embedder).await;

        assert!(matches!(
            result,
            Err(IngestError::Embedding(ServiceError::Embedding(_)))
        ));
        assert!(!index_dir.exists());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_chunking_is_rejected_up_front() -> Result<(), Box<dyn std::error::Error>> {
        let corpus = tempdir()?;
        let options = IngestionOptions {
            chunking: ChunkingConfig {
                max_chars: 100,
                overlap_chars: 100,
            },
            ..IngestionOptions::default()
        };
        let result = ingest_corpus(corpus.path(), &options, &CharacterNgramEmbedder::default()).await;
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
        Ok(())
    }

    #[tokio::test]
    async fn persisted_index_round_trips() -> Result<(), Box<dyn std::error::Error>> {
        let corpus = tempdir()?;
        write_corpus(corpus.path())?;
        let output = tempdir()?;
        let index_dir = output.path().join("index");
        let embedder = CharacterNgramEmbedder::default();

        let report = build_and_persist(corpus.path(), &index_dir, &small_chunks(), &embedder).await?;
        let loaded = VectorIndex::load(&index_dir)?;

        let query = embedder.embed("Who spoke of Rama?").await?;
        assert_eq!(report.index.search(&query, 4)?, loaded.search(&query, 4)?);
        Ok(())
    }
}
