//! Course catalog commands.

use super::open_index;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SyllabusError;
use anyhow::Result;

/// List indexed courses.
pub async fn run_courses(settings: Settings) -> Result<()> {
    preflight::check(Operation::Browse)?;
    let orchestrator = open_index(settings).await?;

    let analytics = orchestrator.course_analytics().await?;
    if analytics.total_courses == 0 {
        return Ok(());
    }

    Output::header(&format!("Indexed Courses ({})", analytics.total_courses));
    println!();
    for title in &analytics.course_titles {
        Output::list_item(title);
    }

    println!();
    Output::kv("Total courses", &analytics.total_courses.to_string());
    Output::kv("Total chunks", &orchestrator.index().chunk_count().await?.to_string());

    Ok(())
}

/// Show the outline of the course best matching `course`.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    // Partial names are resolved through the embedder.
    preflight::check(Operation::Search)?;
    let orchestrator = open_index(settings).await?;

    let entry = match orchestrator.index().course_outline(course).await {
        Ok(entry) => entry,
        Err(e @ SyllabusError::CourseNotFound(_)) => {
            Output::warning(&e.to_string());
            return Ok(());
        }
        Err(e) => {
            Output::error(&format!("Failed to load outline: {}", e));
            return Err(e.into());
        }
    };

    Output::header(&entry.title);
    if let Some(link) = &entry.link {
        Output::kv("Link", link);
    }
    if let Some(instructor) = &entry.instructor {
        Output::kv("Instructor", instructor);
    }
    println!();
    for lesson in &entry.lessons {
        let line = format!("Lesson {}: {}", lesson.number, lesson.title);
        match &lesson.link {
            Some(link) => Output::list_item(&format!("{} ({})", line, link)),
            None => Output::list_item(&line),
        }
    }

    Ok(())
}
