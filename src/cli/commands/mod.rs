//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod courses;
mod ingest;
mod search;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use courses::{run_courses, run_outline};
pub use ingest::run_ingest;
pub use search::run_search;
pub use serve::run_serve;

use crate::cli::Output;
use crate::config::{Settings, StoreProvider};
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Build the orchestrator for a command that reads the index.
///
/// The memory store starts empty in every process, so it is filled from
/// `general.docs_dir` first.
async fn open_index(settings: Settings) -> Result<Orchestrator> {
    let orchestrator = Orchestrator::new(settings)?;

    if orchestrator.settings().vector_store.provider == StoreProvider::Memory {
        let docs_dir = orchestrator.settings().docs_dir();
        if docs_dir.is_dir() {
            let spinner = Output::spinner("Loading course documents...");
            let report = orchestrator.ingest_folder(&docs_dir, false).await;
            spinner.finish_and_clear();
            report?;
        }
    }

    if orchestrator.index().course_count().await? == 0 {
        Output::warning("No courses indexed yet. Use 'syllabus ingest <dir>' to add course documents.");
    }

    Ok(orchestrator)
}
