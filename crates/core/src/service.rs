use crate::citation::extract_citation;
use crate::embeddings::Embedder;
use crate::index::VectorIndex;
use crate::prompt::assemble_prompt;
use crate::retriever::Retriever;
use crate::synthesizer::Synthesizer;
use crate::{Answer, ConfigError, Query, SearchHit, ServiceError};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Fails when `index` records a different embedding model than `embedder`.
/// Indexes without a recorded model are accepted.
pub fn check_embedder<E>(index: &VectorIndex, embedder: &E) -> Result<(), ConfigError>
where
    E: Embedder + ?Sized,
{
    let indexed = index.embedding_model();
    if !indexed.is_empty() && indexed != embedder.model_id() {
        return Err(ConfigError::EmbedderMismatch {
            indexed: indexed.to_string(),
            configured: embedder.model_id().to_string(),
        });
    }
    Ok(())
}

pub struct QaService<E, S> {
    retriever: Retriever<E>,
    synthesizer: S,
}

impl<E, S> QaService<E, S>
where
    E: Embedder,
    S: Synthesizer,
{
    pub fn new(index: Arc<VectorIndex>, embedder: E, synthesizer: S) -> Self {
        Self {
            retriever: Retriever::new(embedder, index),
            synthesizer,
        }
    }

    pub fn open(index_dir: &Path, embedder: E, synthesizer: S) -> Result<Self, ConfigError> {
        let index = VectorIndex::load(index_dir)?;
        check_embedder(&index, &embedder)?;
        Ok(Self::new(Arc::new(index), embedder, synthesizer))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.retriever = self.retriever.with_top_k(top_k);
        self
    }

    pub fn index(&self) -> &VectorIndex {
        self.retriever.index()
    }

    pub async fn search(&self, question: &str) -> Result<Vec<SearchHit>, ServiceError> {
        if question.trim().is_empty() {
            return Err(ServiceError::EmptyQuestion);
        }
        self.retriever.retrieve(question).await
    }

    pub async fn answer(&self, query: &Query) -> Result<Answer, ServiceError> {
        info!(
            mode = %query.mode,
            question_chars = query.question.chars().count(),
            "answering question"
        );

        let hits = self.search(&query.question).await?;
        let prompt = assemble_prompt(&query.question, &hits);
        let answer = self.synthesizer.complete(&prompt).await?;
        let source = extract_citation(&hits);

        info!(hits = hits.len(), source = %source, "answered question");
        Ok(Answer { answer, source })
    }
}
