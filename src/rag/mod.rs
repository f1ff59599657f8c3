//! Retrieval for course question answering.
//!
//! [`SemanticIndex`] owns the catalog and content collections and answers
//! similarity queries over them. [`SessionStore`] keeps the short rolling
//! conversation history that gives follow-up questions their context.

mod history;
mod index;

pub use history::{Role, SessionStore, Turn};
pub use index::{IndexConfig, SemanticIndex};

use serde::{Deserialize, Serialize};

/// Where a piece of retrieved text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub lesson_link: Option<String>,
}

impl SourceAttribution {
    /// Display label, e.g. `"Intro to X - Lesson 2"`.
    pub fn label(&self) -> String {
        match self.lesson_number {
            Some(n) => format!("{} - Lesson {}", self.course_title, n),
            None => self.course_title.clone(),
        }
    }
}

impl std::fmt::Display for SourceAttribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Answer to a user query plus the sources the answer drew on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceAttribution>,
}

/// Summary of what is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_label() {
        let mut source = SourceAttribution {
            course_title: "Intro to X".to_string(),
            lesson_number: Some(2),
            lesson_link: None,
        };
        assert_eq!(source.to_string(), "Intro to X - Lesson 2");

        source.lesson_number = None;
        assert_eq!(source.label(), "Intro to X");
    }
}
