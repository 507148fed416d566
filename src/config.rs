//! Configuration module for the collage layout engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`collagrid.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `COLLAGE_` and use double
//! underscores to separate nested levels:
//! - `COLLAGE_FETCH__PARALLELISM=8` sets `fetch.parallelism`
//! - `COLLAGE_EMBEDDING__ENDPOINT=...` sets `embedding.endpoint`
//! - `COLLAGE_JITTER__ENABLED=false` sets `jitter.enabled`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CollageError, CollageResult};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Root directory for the persistent vector caches
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Image fetching settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Visual vectorizer settings
    #[serde(default)]
    pub visual: VisualConfig,

    /// Description service settings
    #[serde(default)]
    pub description: DescriptionConfig,

    /// Embedding service settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Cosmetic jitter settings
    #[serde(default)]
    pub jitter: JitterConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FetchConfig {
    /// Maximum number of concurrent image fetches
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisualConfig {
    /// Side length of the downsampled thumbnail whose pixels become the
    /// visual vector. Vector length is `3 * resolution^2`.
    #[serde(default = "default_visual_resolution")]
    pub resolution: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DescriptionConfig {
    /// Chat-completions endpoint of the multimodal description service
    #[serde(default = "default_description_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with each description request
    #[serde(default = "default_description_model")]
    pub model: String,

    /// Instruction prompt attached to every image
    #[serde(default = "default_description_prompt")]
    pub prompt: String,

    /// Hard ceiling on completion tokens per description
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Side length images are downsampled to before transport encoding
    #[serde(default = "default_description_resolution")]
    pub resolution: u32,

    /// Environment variable holding the API key
    #[serde(default = "default_description_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Predict endpoint of the text-embedding service
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JitterConfig {
    /// Enable position-dependent jitter of final coordinates
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum perturbation as a fraction of one cell width.
    /// Values above 0.5 would let neighbors visually collide.
    #[serde(default = "default_jitter_strength")]
    pub strength: f32,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".collagrid/cache")
}
fn default_parallelism() -> usize {
    5
}
fn default_fetch_timeout_ms() -> u64 {
    15_000
}
fn default_visual_resolution() -> u32 {
    16
}
fn default_description_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}
fn default_description_model() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".to_string()
}
fn default_description_prompt() -> String {
    "Describe this album cover in a sentence.".to_string()
}
fn default_max_tokens() -> u32 {
    256
}
fn default_description_resolution() -> u32 {
    256
}
fn default_description_key_env() -> String {
    "GROQ_API_KEY".to_string()
}
fn default_embedding_endpoint() -> String {
    "https://aiplatform.googleapis.com/v1/publishers/google/models/text-embedding-005:predict"
        .to_string()
}
fn default_embedding_key_env() -> String {
    "EMBEDDING_API_KEY".to_string()
}
fn default_true() -> bool {
    true
}
fn default_jitter_strength() -> f32 {
    0.25
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_dir: default_cache_dir(),
            fetch: FetchConfig::default(),
            visual: VisualConfig::default(),
            description: DescriptionConfig::default(),
            embedding: EmbeddingConfig::default(),
            jitter: JitterConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            resolution: default_visual_resolution(),
        }
    }
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_description_endpoint(),
            model: default_description_model(),
            prompt: default_description_prompt(),
            max_tokens: default_max_tokens(),
            resolution: default_description_resolution(),
            api_key_env: default_description_key_env(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            api_key_env: default_embedding_key_env(),
        }
    }
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            strength: default_jitter_strength(),
        }
    }
}

impl Settings {
    /// Load settings from the default `collagrid.toml` plus environment.
    pub fn load() -> CollageResult<Self> {
        Self::load_from(&PathBuf::from("collagrid.toml"))
    }

    /// Load settings layered as defaults -> TOML file -> `COLLAGE_*` env.
    pub fn load_from(config_path: &PathBuf) -> CollageResult<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("COLLAGE_").split("__"))
            .extract()
            .map_err(|e| CollageError::Config {
                reason: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would break layout invariants downstream.
    pub fn validate(&self) -> CollageResult<()> {
        if self.fetch.parallelism == 0 {
            return Err(CollageError::Config {
                reason: "fetch.parallelism must be at least 1".to_string(),
            });
        }
        if self.visual.resolution == 0 {
            return Err(CollageError::Config {
                reason: "visual.resolution must be at least 1".to_string(),
            });
        }
        if !(0.0..=0.5).contains(&self.jitter.strength) {
            return Err(CollageError::Config {
                reason: format!(
                    "jitter.strength must be in [0.0, 0.5], got {}",
                    self.jitter.strength
                ),
            });
        }
        Ok(())
    }
}
