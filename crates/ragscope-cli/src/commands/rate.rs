//! Rate command: attach feedback to a logged request

use crate::app::RateArgs;
use anyhow::{bail, Result};
use ragscope_core::{Config, RagScopeError, TelemetryStore};

pub fn run(args: RateArgs, config: &Config) -> Result<()> {
    let store = TelemetryStore::open(&config.telemetry_db_path)?;
    store.initialize()?;

    match store.upsert_feedback(&args.request_id, args.rating, args.comment.as_deref()) {
        Ok(()) => {
            println!("Feedback recorded for {}", args.request_id);
            Ok(())
        }
        Err(error @ RagScopeError::InvalidInput(_)) => Err(error.into()),
        Err(_) => bail!("Internal error: feedback could not be recorded"),
    }
}
