//! Token count estimation
//!
//! Estimates token counts with the "one token ~ 4 characters" rule. This is
//! a deliberately cheap approximation, not a real tokenizer; it exists only
//! to size prompts and answers in telemetry.

/// Estimate the number of tokens in a text
pub fn estimate_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    ((text.chars().count() as f64) / 4.0).round() as u32
}
