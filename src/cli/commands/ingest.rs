//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(dir: Option<&str>, clear: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let dir = dir
        .map(Settings::expand_path)
        .unwrap_or_else(|| settings.docs_dir());
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Indexing {}...", dir.display()));
    let result = orchestrator.ingest_folder(&dir, clear).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Ingest failed: {}", e));
            return Err(e.into());
        }
    };

    for course in &report.ingested {
        Output::success(&format!(
            "{} ({} lessons, {} chunks)",
            course.course_title, course.lessons, course.chunks_indexed
        ));
    }
    for title in &report.skipped {
        Output::info(&format!("Already indexed: {}", title));
    }
    for (path, reason) in &report.failed {
        Output::warning(&format!("Skipped {}: {}", path.display(), reason));
    }

    println!();
    Output::kv("Courses added", &report.ingested.len().to_string());
    Output::kv("Chunks added", &report.total_chunks().to_string());
    Output::kv("Courses in index", &orchestrator.index().course_count().await?.to_string());

    Ok(())
}
