use crate::ServiceError;
use async_trait::async_trait;

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

#[async_trait]
impl<T: Synthesizer + ?Sized> Synthesizer for std::sync::Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        (**self).complete(prompt).await
    }
}
