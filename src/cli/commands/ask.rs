//! Ask command implementation.

use super::open_index;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Query) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = open_index(settings).await?;
    let session = orchestrator.create_session();

    let spinner = Output::spinner("Thinking...");
    let result = orchestrator.query(&session, question).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}", response.answer);
            Output::sources(&response.sources);
            println!();
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
