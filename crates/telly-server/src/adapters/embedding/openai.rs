//! OpenAI embedding adapter
//!
//! Uses text-embedding-3-small (1536 dimensions) unless configured otherwise.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use telly::{DomainError, EmbeddingService};

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Embedding service backed by the OpenAI API
#[derive(Clone)]
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedding {
    pub fn new(api_key: String, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            dimension,
        }
    }

    async fn request(&self, inputs: Vec<&str>) -> Result<Vec<Vec<f32>>, DomainError> {
        let expected = inputs.len();
        let request = EmbeddingRequest {
            input: inputs,
            model: &self.model,
            dimensions: self.dimension,
        };

        let response = self
            .client
            .post(EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::ExternalService(format!("embedding request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::ExternalService(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| DomainError::ExternalService(format!("embedding response: {}", e)))?;

        if body.data.len() != expected {
            return Err(DomainError::ExternalService(format!(
                "expected {} embeddings, got {}",
                expected,
                body.data.len()
            )));
        }
        body.data.sort_by_key(|d| d.index);

        body.data
            .into_iter()
            .map(|d| {
                DomainError::check_dimension(self.dimension, &d.embedding)?;
                Ok(d.embedding)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedding {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        self.request(vec![text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::ExternalService("No embedding returned".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts.iter().map(String::as_str).collect()).await
    }
}
