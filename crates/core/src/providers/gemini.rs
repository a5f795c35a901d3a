use crate::config::ProviderConfig;
use crate::embeddings::Embedder;
use crate::synthesizer::Synthesizer;
use crate::ServiceError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    client: Client,
    config: ProviderConfig,
    embedding_model_id: String,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let embedding_model_id = format!("models/{}", config.embedding_model);
        Ok(Self {
            client,
            config,
            embedding_model_id,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn endpoint(&self, model: &str, method: &str) -> Result<Url, ServiceError> {
        Ok(self
            .config
            .base_url
            .join(&format!("v1beta/models/{model}:{method}"))?)
    }

    async fn post<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> Result<Response, ServiceError> {
        Ok(self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await?)
    }
}

async fn success_body(
    response: Response,
    to_error: fn(String) -> ServiceError,
) -> Result<String, ServiceError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(to_error(format!("{status}: {body}")))
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    fn model_id(&self) -> &str {
        &self.embedding_model_id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let url = self.endpoint(&self.config.embedding_model, "embedContent")?;
        let request = EmbedRequest {
            model: &self.embedding_model_id,
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
        };

        let body = success_body(self.post(url, &request).await?, ServiceError::Embedding).await?;
        let parsed: EmbedResponse = serde_json::from_str(&body)
            .map_err(|error| ServiceError::Embedding(format!("malformed response: {error}")))?;

        let values = parsed
            .embedding
            .map(|embedding| embedding.values)
            .unwrap_or_default();
        if values.is_empty() {
            return Err(ServiceError::Embedding(
                "response carried no embedding values".to_string(),
            ));
        }

        debug!(model = %self.embedding_model_id, dimension = values.len(), "embedded text");
        Ok(values)
    }
}

#[async_trait]
impl Synthesizer for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let url = self.endpoint(&self.config.completion_model, "generateContent")?;
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
        };

        let body = success_body(self.post(url, &request).await?, ServiceError::Synthesis).await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|error| ServiceError::Synthesis(format!("malformed response: {error}")))?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| ServiceError::Synthesis("response carried no candidates".to_string()))?;

        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        debug!(model = %self.config.completion_model, bytes = text.len(), "completed prompt");
        Ok(text)
    }
}
