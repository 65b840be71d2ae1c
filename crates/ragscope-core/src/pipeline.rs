//! Query pipeline orchestration
//!
//! Sequences one retrieval-augmented query: embed the question, search the
//! vector index, compose a grounded prompt, invoke the generation service,
//! and persist exactly one telemetry row whether the query succeeds or
//! fails. The two network-bound phases run inside named tracing spans with
//! latency and token attributes.

use crate::config::Config;
use crate::error::{RagScopeError, Result};
use crate::index::{IndexQueryResult, SourceRef, VectorIndex};
use crate::llm::{Embedder, Generator, OllamaClient};
use crate::telemetry::{RequestLogEntry, TelemetryStore};
use crate::tokenizer::estimate_tokens;
use crate::trace::TraceContext;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Successful query payload returned to the caller
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryResponse {
    pub request_id: Uuid,
    pub answer: String,
    pub retrieved: Vec<SourceRef>,
}

/// The query orchestrator
///
/// One pipeline serves one request at a time; run concurrent requests on
/// independent pipelines. The telemetry store and vector index are SQLite
/// files in WAL mode, so independent pipelines over the same paths do not
/// interfere. Callers should drive `execute` to completion rather than
/// dropping it, so the telemetry row is not lost.
pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    index: VectorIndex,
    telemetry: TelemetryStore,
    top_k: usize,
}

impl QueryPipeline {
    /// Assemble a pipeline from its parts
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        index: VectorIndex,
        telemetry: TelemetryStore,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            generator,
            index,
            telemetry,
            top_k,
        }
    }

    /// Build a pipeline from configuration, wiring an Ollama client into
    /// both the embedding and generation seams
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(config)?);
        let index = VectorIndex::open(&config.index_path, config.collection.clone())?;
        let telemetry = TelemetryStore::open(&config.telemetry_db_path)?;
        telemetry.initialize()?;

        Ok(Self {
            embedder: client.clone(),
            generator: client,
            index,
            telemetry,
            top_k: config.top_k,
        })
    }

    /// Execute one retrieval-augmented query
    ///
    /// Whatever happens in between, exactly one telemetry row is persisted
    /// before this returns: on success the row carries the answer and phase
    /// latencies, on failure the error description and total latency. A
    /// telemetry write failure never masks a successful answer; it is
    /// logged and the answer is returned anyway.
    pub async fn execute(
        &self,
        question: &str,
        trace: Option<&TraceContext>,
    ) -> Result<QueryResponse> {
        let start = Instant::now();
        let mut entry = RequestLogEntry::new(question);

        if let Some(trace) = trace {
            entry.trace_id = Some(trace.trace_id().to_string());
        }

        tracing::info!(
            request_id = %entry.request_id,
            trace_id = entry.trace_id.as_deref().unwrap_or(""),
            "RAG query: {:?}",
            question
        );

        let outcome = self.run_phases(&mut entry).await;

        entry.latency_ms_total = elapsed_ms(start);
        if let Err(ref error) = outcome {
            tracing::error!(
                request_id = %entry.request_id,
                "Error during RAG query: {}",
                error
            );
            entry.error = Some(error.to_string());
        }

        // Terminal write: exactly once per invocation, success or failure.
        if let Err(append_error) = self.telemetry.append(&entry) {
            tracing::error!(
                request_id = %entry.request_id,
                "Failed to persist telemetry record: {}",
                append_error
            );
        }

        tracing::info!(
            request_id = %entry.request_id,
            latency_ms = entry.latency_ms_total,
            "Completed RAG query"
        );

        let answer = outcome?;
        Ok(QueryResponse {
            request_id: entry.request_id,
            answer,
            retrieved: entry.retrieved_sources,
        })
    }

    /// Steps 2-6: retrieval, prompt assembly, generation. Mutates the entry
    /// as each phase completes so a failure leaves a partially filled record
    /// for the terminal write.
    async fn run_phases(&self, entry: &mut RequestLogEntry) -> Result<String> {
        if entry.question.trim().is_empty() {
            return Err(RagScopeError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }

        // Retrieval phase: question embedding + nearest-neighbor search
        let retrieval_span =
            tracing::info_span!("DB Vector Search", latency_ms = tracing::field::Empty);
        let (results, retrieval_ms) = {
            let question = entry.question.clone();
            async {
                let phase_start = Instant::now();
                let embedding = self.embedder.embed(&question).await?;
                let results = self.index.query(&embedding, self.top_k)?;
                Ok::<_, RagScopeError>((results, elapsed_ms(phase_start)))
            }
            .instrument(retrieval_span.clone())
            .await?
        };
        retrieval_span.record("latency_ms", retrieval_ms);
        entry.latency_ms_retrieval = retrieval_ms;
        entry.retrieved_sources = results.metadatas.clone();
        entry.retrieved_distances = Some(results.distances.clone());

        let prompt = build_prompt(&entry.question, &results);

        // Generation phase: prompt sizing + LLM call
        let generation_span = tracing::info_span!(
            "LLM Generation",
            latency_ms = tracing::field::Empty,
            prompt_tokens = tracing::field::Empty,
            answer_tokens = tracing::field::Empty
        );
        entry.prompt_tokens = Some(estimate_tokens(&prompt));
        let (answer, llm_ms) = async {
            let phase_start = Instant::now();
            let answer = self.generator.generate(&prompt).await?;
            Ok::<_, RagScopeError>((answer, elapsed_ms(phase_start)))
        }
        .instrument(generation_span.clone())
        .await?;
        entry.latency_ms_llm = llm_ms;
        entry.answer_tokens = Some(estimate_tokens(&answer));
        entry.answer = Some(answer.clone());
        generation_span.record("latency_ms", llm_ms);
        generation_span.record("prompt_tokens", entry.prompt_tokens.unwrap_or(0));
        generation_span.record("answer_tokens", entry.answer_tokens.unwrap_or(0));

        Ok(answer)
    }

    /// Read-only access to the telemetry store (dashboard read path)
    pub fn telemetry(&self) -> &TelemetryStore {
        &self.telemetry
    }

    /// Read-only access to the vector index
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }
}

/// Elapsed wall time, rounded to the nearest millisecond
fn elapsed_ms(start: Instant) -> u64 {
    (start.elapsed().as_secs_f64() * 1000.0).round() as u64
}

/// Format the grounded prompt: labeled excerpts in rank order, a distinct
/// separator between them, then the verbatim question
fn build_prompt(question: &str, results: &IndexQueryResult) -> String {
    let context = results
        .documents
        .iter()
        .zip(results.metadatas.iter())
        .zip(results.distances.iter())
        .map(|((doc, meta), distance)| {
            format!(
                "From {} (chunk {}), distance={:.4}:\n{}",
                meta.source_file, meta.chunk_index, distance, doc
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!(
        "You are an assistant who answers based on the following excerpts \
from the Federal Reserve's (FED) annual performance reports.

Context:
{context}

Question: {question}

Instructions:
- Answer clearly and concisely.
- If possible, indicate which report/year you are referring to (even just by mentioning it in the text).
- If the context does not contain enough information to answer reliably, state it explicitly.
Answer:
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_labels_and_separates_excerpts() {
        let results = IndexQueryResult {
            documents: vec!["First chunk.".to_string(), "Second chunk.".to_string()],
            metadatas: vec![
                SourceRef {
                    source_file: "a.pdf".to_string(),
                    chunk_index: 0,
                },
                SourceRef {
                    source_file: "b.pdf".to_string(),
                    chunk_index: 3,
                },
            ],
            distances: vec![0.1234, 0.5678],
        };

        let prompt = build_prompt("What happened?", &results);
        assert!(prompt.contains("From a.pdf (chunk 0), distance=0.1234:\nFirst chunk."));
        assert!(prompt.contains("From b.pdf (chunk 3), distance=0.5678:\nSecond chunk."));
        assert!(prompt.contains(CONTEXT_SEPARATOR));
        assert!(prompt.contains("Question: What happened?"));
        // Rank order preserved
        let first = prompt.find("a.pdf").unwrap();
        let second = prompt.find("b.pdf").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_build_prompt_with_no_results() {
        let prompt = build_prompt("anything?", &IndexQueryResult::default());
        assert!(prompt.contains("Question: anything?"));
        assert!(!prompt.contains("From "));
    }
}
