//! Ragscope Core Library
//!
//! Retrieval-augmented query pipeline with integrated observability:
//! answers natural-language questions over a fixed corpus of PDF-derived
//! text chunks and records a durable telemetry row for every request.
//!
//! # Features
//! - Nearest-neighbor retrieval over a persistent SQLite vector index
//! - Ollama-compatible embedding and generation HTTP clients
//! - Named tracing spans around both network-bound phases
//! - Append-only request log with feedback, additively migrated on start

pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod telemetry;
pub mod tokenizer;
pub mod trace;

pub use config::Config;
pub use error::{Error, RagScopeError, Result};
pub use index::{IndexQueryResult, SourceRef, VectorIndex};
pub use llm::{Embedder, Generator, OllamaClient};
pub use pipeline::{QueryPipeline, QueryResponse};
pub use telemetry::{LoggedRequest, RequestLogEntry, TelemetryStore};
pub use tokenizer::estimate_tokens;
pub use trace::TraceContext;
