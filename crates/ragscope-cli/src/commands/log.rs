//! Log command: the dashboard read path

use crate::app::{LogArgs, OutputFormat};
use anyhow::Result;
use ragscope_core::{Config, LoggedRequest, TelemetryStore};

pub fn run(args: LogArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let store = TelemetryStore::open(&config.telemetry_db_path)?;
    store.initialize()?;

    let limit = if args.all { None } else { Some(args.limit) };
    let rows = store.query_latest(limit)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Cli => {
            if rows.is_empty() {
                println!("No requests logged yet.");
                return Ok(());
            }
            for row in &rows {
                print_row(row);
            }
        }
    }

    Ok(())
}

fn print_row(row: &LoggedRequest) {
    println!("{}  {}", row.timestamp, row.request_id);
    println!("  Q: {}", row.question);
    match (&row.answer, &row.error) {
        (Some(answer), _) => println!("  A: {}", truncate(answer, 150)),
        (None, Some(error)) => println!("  ERROR: {}", error),
        (None, None) => println!("  A: <none>"),
    }
    println!(
        "  latency: {}ms total ({}ms retrieval, {}ms llm)",
        row.latency_ms_total, row.latency_ms_retrieval, row.latency_ms_llm
    );
    if let (Some(prompt), Some(answer)) = (row.prompt_tokens, row.answer_tokens) {
        println!("  tokens: {} prompt, {} answer", prompt, answer);
    }
    if let Some(rating) = row.rating {
        match &row.comment {
            Some(comment) => println!("  rating: {}/5 ({})", rating, comment),
            None => println!("  rating: {}/5", rating),
        }
    }
    if let Some(trace_id) = &row.trace_id {
        println!("  trace_id: {}", trace_id);
    }
    println!();
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max_chars).collect();
        format!("{}...", prefix)
    }
}
