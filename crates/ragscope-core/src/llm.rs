//! HTTP clients for external inference services (Ollama and compatible)

use crate::config::Config;
use crate::error::{RagScopeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts, one vector per input in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Text generation trait
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a non-streaming completion for the full prompt,
    /// returning the trimmed response text
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Client for Ollama-style embed/generate endpoints
///
/// Uses two separate reqwest clients so each phase gets its own bounded
/// timeout: embedding calls are short, generation calls dominate total
/// latency and need a generous limit.
pub struct OllamaClient {
    embed_client: reqwest::Client,
    generate_client: reqwest::Client,
    embed_url: String,
    embed_model: String,
    generate_url: String,
    generate_model: String,
}

impl OllamaClient {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let embed_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.embed_timeout_secs))
            .build()
            .map_err(RagScopeError::Http)?;

        let generate_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.generate_timeout_secs))
            .build()
            .map_err(RagScopeError::Http)?;

        Ok(Self {
            embed_client,
            generate_client,
            embed_url: config.embed_url.clone(),
            embed_model: config.embed_model.clone(),
            generate_url: config.generate_url.clone(),
            generate_model: config.generate_model.clone(),
        })
    }

    async fn post_embed(&self, input: EmbedInput) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: EmbedInput,
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            embeddings: Option<Vec<Vec<f32>>>,
        }

        let request = EmbedRequest {
            model: &self.embed_model,
            input,
        };

        let response = self
            .embed_client
            .post(&self.embed_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagScopeError::Upstream(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await?;
        match embed_response.embeddings {
            Some(embeddings) if !embeddings.is_empty() => Ok(embeddings),
            _ => Err(RagScopeError::MalformedResponse(
                "No embeddings returned from embedding service".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbedInput {
    Single(String),
    Batch(Vec<String>),
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.post_embed(EmbedInput::Single(text.to_string())).await?;
        embeddings.into_iter().next().ok_or_else(|| {
            RagScopeError::MalformedResponse("No embeddings returned".to_string())
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.post_embed(EmbedInput::Batch(texts.to_vec())).await?;
        if embeddings.len() != texts.len() {
            return Err(RagScopeError::MalformedResponse(format!(
                "Embedding count mismatch: {} inputs, {} vectors",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.embed_model
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            response: Option<String>,
        }

        let request = GenerateRequest {
            model: &self.generate_model,
            prompt,
            stream: false,
        };

        let response = self
            .generate_client
            .post(&self.generate_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagScopeError::Upstream(format!(
                "Generation service error (HTTP {}): {}",
                status, body
            )));
        }

        let generate_response: GenerateResponse = response.json().await?;
        let answer = generate_response.response.ok_or_else(|| {
            RagScopeError::MalformedResponse(
                "Missing response field from generation service".to_string(),
            )
        })?;

        Ok(answer.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.generate_model
    }
}
