//! Ask command: run one retrieval-augmented query

use crate::app::{AskArgs, OutputFormat};
use anyhow::{bail, Result};
use ragscope_core::{Config, QueryPipeline, RagScopeError, TraceContext};

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let question = args.question.join(" ");
    let pipeline = QueryPipeline::from_config(config)?;

    let trace = args.trace.then(TraceContext::generate);
    if let Some(ref trace) = trace {
        eprintln!("trace_id: {}", trace.trace_id());
    }

    let response = match pipeline.execute(&question, trace.as_ref()).await {
        Ok(response) => response,
        // Validation problems are the user's to fix and keep their typed
        // error (exit code mapping); everything else stays generic, the
        // detail lives in the telemetry row
        Err(error @ RagScopeError::InvalidInput(_)) => return Err(error.into()),
        Err(_) => bail!("Internal error: the query could not be completed"),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Cli => {
            println!("{}", response.answer);
            println!();
            println!("Sources:");
            for source in &response.retrieved {
                println!("  {} (chunk {})", source.source_file, source.chunk_index);
            }
            println!();
            println!("request_id: {}", response.request_id);
        }
    }

    Ok(())
}
