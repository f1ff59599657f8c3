//! In-memory vector store implementation.
//!
//! Useful for testing and small corpora.

use super::{
    cosine_similarity, rank_catalog, rank_content, CatalogEntry, CatalogMatch, ContentEntry,
    ContentFilter, SearchResult, VectorStore,
};
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Collections {
    catalog: HashMap<String, CatalogEntry>,
    content: BTreeMap<(String, u32), ContentEntry>,
}

impl Collections {
    fn remove_content(&mut self, course_title: &str) -> usize {
        let before = self.content.len();
        self.content.retain(|(title, _), _| title != course_title);
        before - self.content.len()
    }
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    inner: RwLock<Collections>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collections::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|e| SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|e| SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn replace_course(&self, entry: &CatalogEntry, chunks: &[ContentEntry]) -> Result<usize> {
        let mut inner = self.write()?;
        inner.remove_content(&entry.title);
        inner.catalog.insert(entry.title.clone(), entry.clone());
        for chunk in chunks {
            inner
                .content
                .insert((chunk.course_title.clone(), chunk.chunk_index), chunk.clone());
        }
        Ok(chunks.len())
    }

    async fn delete_course(&self, course_title: &str) -> Result<usize> {
        let mut inner = self.write()?;
        inner.catalog.remove(course_title);
        Ok(inner.remove_content(course_title))
    }

    async fn search_content(
        &self,
        query_embedding: &[f32],
        filter: &ContentFilter,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>> {
        let inner = self.read()?;

        let mut results: Vec<SearchResult> = inner
            .content
            .values()
            .filter(|entry| filter.matches(entry))
            .map(|entry| SearchResult {
                score: cosine_similarity(query_embedding, &entry.embedding),
                entry: entry.clone(),
            })
            .filter(|r| min_score.is_none_or(|floor| r.score >= floor))
            .collect();

        rank_content(&mut results, limit);
        Ok(results)
    }

    async fn search_catalog(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<CatalogMatch>> {
        let inner = self.read()?;

        let mut matches: Vec<CatalogMatch> = inner
            .catalog
            .values()
            .map(|entry| CatalogMatch {
                score: cosine_similarity(query_embedding, &entry.embedding),
                entry: entry.clone(),
            })
            .collect();

        rank_catalog(&mut matches, limit);
        Ok(matches)
    }

    async fn get_course(&self, title: &str) -> Result<Option<CatalogEntry>> {
        Ok(self.read()?.catalog.get(title).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<CatalogEntry>> {
        let mut courses: Vec<CatalogEntry> = self.read()?.catalog.values().cloned().collect();
        courses.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(courses)
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.read()?.content.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.write()?;
        inner.catalog.clear();
        inner.content.clear();
        Ok(())
    }
}
