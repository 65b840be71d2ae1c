//! In-flight telemetry record for one query attempt

use crate::index::SourceRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One query attempt, mutated in place through each pipeline phase and
/// persisted exactly once at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogEntry {
    /// Primary correlation key across the log and feedback tables
    pub request_id: Uuid,

    /// Distributed-trace id (32 hex chars), set only when a trace context
    /// was active; absence is not an error
    pub trace_id: Option<String>,

    /// Original user question, verbatim
    pub question: String,

    /// Generated answer; set once, only on successful generation
    pub answer: Option<String>,

    /// Wall time of the whole execution, always set (even on failure)
    pub latency_ms_total: u64,

    /// Wall time of the embedding + vector search phase
    pub latency_ms_retrieval: u64,

    /// Wall time of the generation phase
    pub latency_ms_llm: u64,

    /// Retrieved chunk identities, insertion order = relevance rank
    pub retrieved_sources: Vec<SourceRef>,

    /// Cosine distances, same order and cardinality as retrieved_sources
    pub retrieved_distances: Option<Vec<f32>>,

    /// Estimated prompt size
    pub prompt_tokens: Option<u32>,

    /// Estimated answer size
    pub answer_tokens: Option<u32>,

    /// Error description when the execution failed
    pub error: Option<String>,
}

impl RequestLogEntry {
    /// Create a fresh entry with a new request id
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            trace_id: None,
            question: question.into(),
            answer: None,
            latency_ms_total: 0,
            latency_ms_retrieval: 0,
            latency_ms_llm: 0,
            retrieved_sources: Vec::new(),
            retrieved_distances: None,
            prompt_tokens: None,
            answer_tokens: None,
            error: None,
        }
    }
}
