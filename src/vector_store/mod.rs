//! Vector store abstraction for Syllabus.
//!
//! The store holds two logical collections that are kept in sync at load
//! time but queried independently:
//!
//! - the **catalog**: one [`CatalogEntry`] per course, embedded over the
//!   course title and used to resolve loosely typed course names;
//! - the **content**: one [`ContentEntry`] per chunk, embedded over the chunk
//!   text and keyed by course title and chunk index.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::course::Lesson;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Catalog collection entry: course metadata plus a title embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub instructor: Option<String>,
    pub link: Option<String>,
    pub lessons: Vec<Lesson>,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn lesson_link(&self, lesson_number: u32) -> Option<&str> {
        self.lessons
            .iter()
            .find(|l| l.number == lesson_number)
            .and_then(|l| l.link.as_deref())
    }
}

/// Content collection entry: one chunk of course text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: u32,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A content search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: ContentEntry,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// A catalog search result with score.
#[derive(Debug, Clone)]
pub struct CatalogMatch {
    pub entry: CatalogEntry,
    pub score: f32,
}

/// Metadata restriction applied before ranking content entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl ContentFilter {
    pub fn course(title: impl Into<String>) -> Self {
        Self {
            course_title: Some(title.into()),
            lesson_number: None,
        }
    }

    pub fn with_lesson(mut self, lesson_number: Option<u32>) -> Self {
        self.lesson_number = lesson_number;
        self
    }

    pub fn matches(&self, entry: &ContentEntry) -> bool {
        self.course_title
            .as_ref()
            .is_none_or(|t| *t == entry.course_title)
            && self
                .lesson_number
                .is_none_or(|n| entry.lesson_number == Some(n))
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Replace everything stored for a course: its catalog entry and all of
    /// its content entries. Re-running with the same input leaves exactly one
    /// catalog entry and one content entry per chunk index.
    async fn replace_course(&self, entry: &CatalogEntry, chunks: &[ContentEntry]) -> Result<usize>;

    /// Delete a course from both collections. Returns removed content entries.
    async fn delete_course(&self, course_title: &str) -> Result<usize>;

    /// Rank content entries passing `filter`, best first. Without a
    /// `min_score` every entry is eligible, including negative similarities.
    async fn search_content(
        &self,
        query_embedding: &[f32],
        filter: &ContentFilter,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>>;

    /// Rank catalog entries, best first.
    async fn search_catalog(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<CatalogMatch>>;

    /// Look up a catalog entry by exact title.
    async fn get_course(&self, title: &str) -> Result<Option<CatalogEntry>>;

    /// All catalog entries, ordered by title.
    async fn list_courses(&self) -> Result<Vec<CatalogEntry>>;

    /// Total number of content entries.
    async fn chunk_count(&self) -> Result<usize>;

    /// Remove everything from both collections.
    async fn clear(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort content results best first. Equal scores fall back to document order
/// so rankings are reproducible.
pub(crate) fn rank_content(results: &mut Vec<SearchResult>, limit: usize) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.entry.course_title.cmp(&b.entry.course_title))
            .then_with(|| a.entry.chunk_index.cmp(&b.entry.chunk_index))
    });
    results.truncate(limit);
}

pub(crate) fn rank_catalog(matches: &mut Vec<CatalogMatch>, limit: usize) {
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.entry.title.cmp(&b.entry.title))
    });
    matches.truncate(limit);
}
