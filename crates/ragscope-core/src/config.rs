//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
///
/// Every field has an env-backed default (`RAGSCOPE_*`), so a bare
/// `Config::default()` talks to a local Ollama instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL of the embedding endpoint
    #[serde(default = "default_embed_url")]
    pub embed_url: String,

    /// Model name for embeddings
    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    /// URL of the text generation endpoint
    #[serde(default = "default_generate_url")]
    pub generate_url: String,

    /// Model name for generation
    #[serde(default = "default_generate_model")]
    pub generate_model: String,

    /// Path of the vector index database
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Collection name inside the vector index
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Path of the telemetry database
    #[serde(default = "default_telemetry_db_path")]
    pub telemetry_db_path: PathBuf,

    /// Embedding request timeout in seconds (short: embedding is cheap)
    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,

    /// Generation request timeout in seconds (long: generation dominates
    /// total latency)
    #[serde(default = "default_generate_timeout")]
    pub generate_timeout_secs: u64,

    /// Number of nearest neighbors to retrieve per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embed_url: default_embed_url(),
            embed_model: default_embed_model(),
            generate_url: default_generate_url(),
            generate_model: default_generate_model(),
            index_path: default_index_path(),
            collection: default_collection(),
            telemetry_db_path: default_telemetry_db_path(),
            embed_timeout_secs: default_embed_timeout(),
            generate_timeout_secs: default_generate_timeout(),
            top_k: default_top_k(),
        }
    }
}

fn default_embed_url() -> String {
    std::env::var("RAGSCOPE_EMBED_URL")
        .unwrap_or_else(|_| "http://localhost:11434/api/embed".to_string())
}

fn default_embed_model() -> String {
    std::env::var("RAGSCOPE_EMBED_MODEL").unwrap_or_else(|_| "nomic-embed-text".to_string())
}

fn default_generate_url() -> String {
    std::env::var("RAGSCOPE_GENERATE_URL")
        .unwrap_or_else(|_| "http://localhost:11434/api/generate".to_string())
}

fn default_generate_model() -> String {
    std::env::var("RAGSCOPE_GENERATE_MODEL").unwrap_or_else(|_| "llama3.1".to_string())
}

fn default_index_path() -> PathBuf {
    std::env::var("RAGSCOPE_INDEX_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("vector_index.sqlite"))
}

fn default_collection() -> String {
    std::env::var("RAGSCOPE_COLLECTION").unwrap_or_else(|_| "fed_reports".to_string())
}

fn default_telemetry_db_path() -> PathBuf {
    std::env::var("RAGSCOPE_TELEMETRY_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("telemetry.sqlite"))
}

fn default_embed_timeout() -> u64 {
    60
}

fn default_generate_timeout() -> u64 {
    300
}

fn default_top_k() -> usize {
    4
}
