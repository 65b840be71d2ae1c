//! Trace correlation
//!
//! A `TraceContext` carries the distributed-trace id for one logical
//! operation. It is constructed explicitly by the caller and threaded into
//! the pipeline as `Option<&TraceContext>` rather than read from ambient
//! global state; absence is not an error.

/// Explicit trace context for one logical operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    trace_id: String,
}

impl TraceContext {
    /// Generate a fresh random 128-bit trace id (32 lowercase hex chars)
    pub fn generate() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    /// Adopt an existing trace id; accepts exactly 32 hex characters
    pub fn from_hex(trace_id: &str) -> Option<Self> {
        if trace_id.len() == 32 && trace_id.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self {
                trace_id: trace_id.to_ascii_lowercase(),
            })
        } else {
            None
        }
    }

    /// The trace id as 32 lowercase hex characters
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}
