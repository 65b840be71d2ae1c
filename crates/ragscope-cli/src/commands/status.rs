//! Status command: index and telemetry overview

use crate::app::OutputFormat;
use anyhow::Result;
use ragscope_core::{Config, Embedder, Generator, OllamaClient, TelemetryStore, VectorIndex};

pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let index = VectorIndex::open(&config.index_path, config.collection.clone())?;
    let store = TelemetryStore::open(&config.telemetry_db_path)?;
    store.initialize()?;
    let client = OllamaClient::new(config)?;

    let embed_model = Embedder::model_name(&client);
    let generate_model = Generator::model_name(&client);

    match format {
        OutputFormat::Json => {
            let status = serde_json::json!({
                "index_path": config.index_path,
                "collection": index.collection(),
                "chunks": index.len()?,
                "telemetry_db_path": config.telemetry_db_path,
                "requests": store.count()?,
                "embed_model": embed_model,
                "embed_url": config.embed_url,
                "generate_model": generate_model,
                "generate_url": config.generate_url,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Cli => {
            println!("Vector index:   {}", config.index_path.display());
            println!("  collection:   {}", index.collection());
            println!("  chunks:       {}", index.len()?);
            println!("Telemetry:      {}", config.telemetry_db_path.display());
            println!("  requests:     {}", store.count()?);
            println!("Embedding:      {} via {}", embed_model, config.embed_url);
            println!("Generation:     {} via {}", generate_model, config.generate_url);
        }
    }

    Ok(())
}
