//! Configuration loading for ragbus.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Get the ragbus home directory (~/.ragbus).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".ragbus"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.ragbus/settings.json
pub fn load_settings() -> Result<Settings> {
    let path = get_settings_path()?;

    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    let mut settings: Settings = serde_json::from_str(&content)?;
    apply_env_overrides(&mut settings);
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Load settings or return default if not found.
pub fn load_settings_or_default() -> Settings {
    load_settings().unwrap_or_else(|e| {
        tracing::warn!("Failed to load settings: {}, using defaults", e);
        let mut settings = Settings::default();
        apply_env_overrides(&mut settings);
        settings
    })
}

fn apply_env_overrides(settings: &mut Settings) {
    if settings.models.openai.api_key.is_none() {
        settings.models.openai.api_key = std::env::var("OPENAI_API_KEY").ok();
    }
}

pub fn validate_settings(settings: &Settings) -> Result<()> {
    let chunking = &settings.chunking;
    if chunking.chunk_size == 0 {
        return Err(Error::Config("chunking.chunk_size must be positive".to_string()));
    }
    if chunking.chunk_overlap >= chunking.chunk_size {
        return Err(Error::Config(format!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            chunking.chunk_overlap, chunking.chunk_size
        )));
    }
    if settings.retrieval.top_k == 0 {
        return Err(Error::Config("retrieval.top_k must be positive".to_string()));
    }
    if settings.retrieval.dimensions == 0 {
        return Err(Error::Config("retrieval.dimensions must be positive".to_string()));
    }
    Ok(())
}

/// Chunking configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Chunking {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1500
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for Chunking {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Retrieval configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Retrieval {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// "fastembed" (local model), "ollama", or "hashing" (lexical, deterministic)
    #[serde(default = "default_embedder")]
    pub embedder: String,
    /// Model id for the fastembed embedder
    #[serde(default = "default_local_model")]
    pub local_model: String,
    /// Model download cache; the platform cache dir when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_top_k() -> usize {
    3
}

fn default_embedder() -> String {
    "fastembed".to_string()
}

fn default_local_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

impl Default for Retrieval {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            embedder: default_embedder(),
            local_model: default_local_model(),
            cache_dir: None,
            dimensions: default_dimensions(),
            ollama_url: default_ollama_url(),
            embedding_model: default_embedding_model(),
        }
    }
}

/// Provider model configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProviderModel {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Models configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Models {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub openai: ProviderModel,
    #[serde(default)]
    pub ollama: ProviderModel,
}

fn default_provider() -> String {
    "ollama".to_string()
}

impl Default for Models {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            openai: ProviderModel::default(),
            ollama: ProviderModel::default(),
        }
    }
}

/// Answer generation configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Generation {
    /// Characters of each source chunk echoed back in a final response.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_snippet_chars() -> usize {
    300
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_retries() -> u32 {
    1
}

impl Default for Generation {
    fn default() -> Self {
        Self {
            snippet_chars: default_snippet_chars(),
            timeout_seconds: default_timeout_seconds(),
            retries: default_retries(),
        }
    }
}

/// Pipeline behaviour.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Pipeline {
    /// Emit a `pipeline_error` envelope to the user instead of halting silently.
    #[serde(default)]
    pub report_halts: bool,
}

/// ragbus settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub chunking: Chunking,

    #[serde(default)]
    pub retrieval: Retrieval,

    #[serde(default)]
    pub models: Models,

    #[serde(default)]
    pub generation: Generation,

    #[serde(default)]
    pub pipeline: Pipeline,
}
