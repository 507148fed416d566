//! Semantic vectorizer: description and embedding service clients.
//!
//! The semantic fingerprint of an image is produced in two hops across two
//! external services:
//!
//! 1. A multimodal chat-completion service turns a downsampled, base64
//!    data-URL-encoded copy of the image into a one-sentence description,
//!    under a fixed instruction prompt and a hard token ceiling.
//! 2. A text-embedding service turns a whole batch of descriptions into
//!    fixed-length vectors in a single call, order-aligned with its input.
//!
//! Both seams are traits so tests (and alternative providers) can slot in
//! without touching the pipeline.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::io::Cursor;

use crate::config::{DescriptionConfig, EmbeddingConfig};
use crate::error::{CollageError, CollageResult, ServiceKind};
use crate::vector::ImageReference;

/// Produces a short natural-language description of an image.
pub trait DescriptionService: Send + Sync {
    fn describe(
        &self,
        reference: &ImageReference,
        image: &DynamicImage,
    ) -> impl Future<Output = CollageResult<String>> + Send;
}

/// Converts a batch of texts into one embedding per text.
///
/// The returned vectors are order-aligned with the input batch. Any
/// transport error fails the whole batch; there is no per-item recovery.
pub trait EmbeddingService: Send + Sync {
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = CollageResult<Vec<Vec<f32>>>> + Send;
}

fn service_error(service: ServiceKind, reason: impl std::fmt::Display) -> CollageError {
    CollageError::Service {
        service,
        reason: reason.to_string(),
    }
}

/// OpenAI-compatible chat-completions client for image descriptions.
pub struct ChatDescriptionClient {
    client: Client,
    config: DescriptionConfig,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatDescriptionClient {
    /// Build a client, reading the API key from the configured env var.
    pub fn new(config: DescriptionConfig) -> CollageResult<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| CollageError::Config {
            reason: format!(
                "description API key not set (expected env var {})",
                config.api_key_env
            ),
        })?;
        Ok(Self {
            client: Client::new(),
            config,
            api_key,
        })
    }

    /// Downsample and encode an image as a `data:` URL for transport.
    ///
    /// The description model does not need full resolution, and the base64
    /// payload grows with pixel count, so images are shrunk first.
    fn encode_data_url(&self, image: &DynamicImage) -> CollageResult<String> {
        let resolution = self.config.resolution;
        let small = if image.width() > resolution || image.height() > resolution {
            image.resize(resolution, resolution, FilterType::Triangle)
        } else {
            image.clone()
        };
        let mut buf = Cursor::new(Vec::new());
        small
            .to_rgb8()
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| service_error(ServiceKind::Description, e))?;
        Ok(format!(
            "data:image/png;base64,{}",
            BASE64.encode(buf.into_inner())
        ))
    }
}

impl DescriptionService for ChatDescriptionClient {
    async fn describe(
        &self,
        reference: &ImageReference,
        image: &DynamicImage,
    ) -> CollageResult<String> {
        let data_url = self.encode_data_url(image)?;
        let payload = json!({
            "model": self.config.model,
            "max_completion_tokens": self.config.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": self.config.prompt},
                    {"type": "image_url", "image_url": {"url": data_url}},
                ],
            }],
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| service_error(ServiceKind::Description, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(
                ServiceKind::Description,
                format!("HTTP {status}: {body}"),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| service_error(ServiceKind::Description, e))?;
        let description = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                service_error(ServiceKind::Description, "response contained no choices")
            })?;

        tracing::info!(
            reference = reference.as_str(),
            description = description.as_str(),
            "described image"
        );
        Ok(description)
    }
}

/// Vertex-style predict client for batched text embeddings.
pub struct PredictEmbeddingClient {
    client: Client,
    config: EmbeddingConfig,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    embeddings: PredictionEmbeddings,
}

#[derive(Debug, Deserialize)]
struct PredictionEmbeddings {
    values: Vec<f32>,
}

impl PredictEmbeddingClient {
    /// Build a client, reading the API key from the configured env var.
    pub fn new(config: EmbeddingConfig) -> CollageResult<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| CollageError::Config {
            reason: format!(
                "embedding API key not set (expected env var {})",
                config.api_key_env
            ),
        })?;
        Ok(Self {
            client: Client::new(),
            config,
            api_key,
        })
    }
}

impl EmbeddingService for PredictEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> CollageResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let instances: Vec<serde_json::Value> =
            texts.iter().map(|text| json!({"content": text})).collect();
        let payload = json!({"instances": instances});

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| service_error(ServiceKind::Embedding, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(
                ServiceKind::Embedding,
                format!("HTTP {status}: {body}"),
            ));
        }

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| service_error(ServiceKind::Embedding, e))?;

        if parsed.predictions.len() != texts.len() {
            return Err(service_error(
                ServiceKind::Embedding,
                format!(
                    "expected {} predictions, got {}",
                    texts.len(),
                    parsed.predictions.len()
                ),
            ));
        }

        tracing::info!(batch = texts.len(), "embedded description batch");
        Ok(parsed
            .predictions
            .into_iter()
            .map(|p| p.embeddings.values)
            .collect())
    }
}
