//! Semantic index over the catalog and content collections.

use super::CourseAnalytics;
use crate::course::{Course, CourseChunk};
use crate::embedding::Embedder;
use crate::error::{Result, SyllabusError};
use crate::vector_store::{CatalogEntry, ContentEntry, ContentFilter, SearchResult, VectorStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Retrieval limits and similarity floors.
#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    /// Default number of content results.
    pub max_results: usize,
    /// Content results scoring below this are dropped; `None` keeps all.
    pub min_score: Option<f32>,
    /// Catalog matches scoring below this do not resolve a course name.
    pub course_match_threshold: f32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_score: None,
            course_match_threshold: 0.3,
        }
    }
}

/// Embeds text and drives the vector store.
pub struct SemanticIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    config: IndexConfig,
}

impl SemanticIndex {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, config: IndexConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Index a course and its chunks, replacing anything previously stored
    /// under the same title. Returns the number of content entries written.
    #[instrument(skip(self, course, chunks), fields(course = %course.title, chunks = chunks.len()))]
    pub async fn index(&self, course: &Course, chunks: &[CourseChunk]) -> Result<usize> {
        if let Some(stray) = chunks.iter().find(|c| c.course_title != course.title) {
            return Err(SyllabusError::InvalidInput(format!(
                "Chunk {} belongs to '{}', not '{}'",
                stray.chunk_index, stray.course_title, course.title
            )));
        }

        let title_embedding = self.embedder.embed(&course.title).await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&texts).await?
        };

        let catalog = CatalogEntry {
            title: course.title.clone(),
            instructor: course.instructor.clone(),
            link: course.link.clone(),
            lessons: course.lessons.clone(),
            embedding: title_embedding,
            indexed_at: Utc::now(),
        };

        let content: Vec<ContentEntry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ContentEntry {
                course_title: chunk.course_title.clone(),
                lesson_number: chunk.lesson_number,
                chunk_index: chunk.chunk_index,
                content: chunk.content.clone(),
                embedding,
            })
            .collect();

        let stored = self.store.replace_course(&catalog, &content).await?;
        info!("Indexed '{}' ({} chunks)", course.title, stored);
        Ok(stored)
    }

    /// Nearest content entries for `query`, restricted by `filter`.
    /// `limit` defaults to the configured `max_results`.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        filter: &ContentFilter,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let embedding = self.embedder.embed(query).await?;
        let results = self
            .store
            .search_content(
                &embedding,
                filter,
                limit.unwrap_or(self.config.max_results),
                self.config.min_score,
            )
            .await?;

        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Map a loosely typed course reference to a stored course title.
    ///
    /// An exact title wins outright; otherwise the closest catalog entry is
    /// used if it clears `course_match_threshold`.
    #[instrument(skip(self))]
    pub async fn resolve_course_name(&self, partial: &str) -> Result<Option<String>> {
        if let Some(entry) = self.store.get_course(partial).await? {
            return Ok(Some(entry.title));
        }

        let embedding = self.embedder.embed(partial).await?;
        let best = self.store.search_catalog(&embedding, 1).await?.into_iter().next();

        Ok(best.and_then(|m| {
            debug!("Closest course to '{}' is '{}' ({:.3})", partial, m.entry.title, m.score);
            (m.score >= self.config.course_match_threshold).then_some(m.entry.title)
        }))
    }

    /// Resolve a course name and return its catalog entry.
    pub async fn course_outline(&self, name: &str) -> Result<CatalogEntry> {
        let not_found = || SyllabusError::CourseNotFound(name.to_string());
        let title = self.resolve_course_name(name).await?.ok_or_else(not_found)?;
        self.store.get_course(&title).await?.ok_or_else(not_found)
    }

    /// Link of a lesson, if the course and lesson exist and a link was given.
    pub async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        Ok(self
            .store
            .get_course(course_title)
            .await?
            .and_then(|c| c.lesson_link(lesson_number).map(str::to_string)))
    }

    pub async fn is_indexed(&self, course_title: &str) -> Result<bool> {
        Ok(self.store.get_course(course_title).await?.is_some())
    }

    pub async fn course_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_courses()
            .await?
            .into_iter()
            .map(|c| c.title)
            .collect())
    }

    pub async fn course_count(&self) -> Result<usize> {
        Ok(self.store.list_courses().await?.len())
    }

    pub async fn chunk_count(&self) -> Result<usize> {
        self.store.chunk_count().await
    }

    pub async fn analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    /// Remove every course from the index.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}
