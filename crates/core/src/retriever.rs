use crate::embeddings::Embedder;
use crate::index::{VectorIndex, DEFAULT_TOP_K};
use crate::{SearchHit, ServiceError};
use std::sync::Arc;

pub struct Retriever<E> {
    embedder: E,
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl<E: Embedder> Retriever<E> {
    pub fn new(embedder: E, index: Arc<VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchHit>, ServiceError> {
        let query_vector = self.embedder.embed(question).await?;
        Ok(self.index.search(&query_vector, self.top_k)?)
    }
}
