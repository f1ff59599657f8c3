//! Search command implementation.

use super::open_index;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::SourceAttribution;
use crate::vector_store::ContentFilter;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    course: Option<&str>,
    lesson: Option<u32>,
    limit: Option<usize>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = open_index(settings).await?;
    let index = orchestrator.index();

    let spinner = Output::spinner("Searching...");

    let mut filter = ContentFilter::default();
    if let Some(name) = course {
        match index.resolve_course_name(name).await {
            Ok(Some(title)) => filter = ContentFilter::course(title),
            Ok(None) => {
                spinner.finish_and_clear();
                Output::warning(&format!("No course found matching '{}'", name));
                return Ok(());
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Search failed: {}", e));
                return Err(e.into());
            }
        }
    }
    let filter = filter.with_lesson(lesson);

    let results = index.search(query, &filter, limit).await;
    spinner.finish_and_clear();

    let results = match results {
        Ok(results) => results,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if results.is_empty() {
        Output::warning("No results found matching your query.");
        return Ok(());
    }

    Output::success(&format!("Found {} results", results.len()));
    for result in &results {
        let entry = &result.entry;
        let source = SourceAttribution {
            course_title: entry.course_title.clone(),
            lesson_number: entry.lesson_number,
            lesson_link: match entry.lesson_number {
                Some(n) => index.lesson_link(&entry.course_title, n).await?,
                None => None,
            },
        };
        Output::search_result(&source.label(), result.score, &entry.content, source.lesson_link.as_deref());
    }

    Ok(())
}
