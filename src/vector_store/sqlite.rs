//! SQLite-based vector store implementation.
//!
//! Embeddings are stored as little-endian `f32` blobs and similarity is
//! computed in Rust. Metadata filters run in SQL before ranking.

use super::{
    cosine_similarity, rank_catalog, rank_content, CatalogEntry, CatalogMatch, ContentEntry,
    ContentFilter, SearchResult, VectorStore,
};
use crate::course::Lesson;
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS courses (
        title TEXT PRIMARY KEY,
        instructor TEXT,
        link TEXT,
        lessons_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        course_title TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        lesson_number INTEGER,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        PRIMARY KEY (course_title, chunk_index)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_lesson ON chunks(course_title, lesson_number);
"#;

const CATALOG_COLUMNS: &str = "title, instructor, link, lessons_json, embedding, indexed_at";

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SyllabusError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn catalog_from_row(row: &Row<'_>) -> rusqlite::Result<(CatalogEntry, String)> {
        let embedding_bytes: Vec<u8> = row.get(4)?;
        let indexed_at_str: String = row.get(5)?;

        let entry = CatalogEntry {
            title: row.get(0)?,
            instructor: row.get(1)?,
            link: row.get(2)?,
            lessons: Vec::new(),
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        };
        Ok((entry, row.get(3)?))
    }

    /// Attach the lesson list decoded from its JSON column.
    fn with_lessons((mut entry, lessons_json): (CatalogEntry, String)) -> Result<CatalogEntry> {
        entry.lessons = serde_json::from_str::<Vec<Lesson>>(&lessons_json)?;
        Ok(entry)
    }

    fn query_catalog(conn: &Connection, sql: &str) -> Result<Vec<CatalogEntry>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], Self::catalog_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::with_lessons).collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entry, chunks), fields(course = %entry.title))]
    async fn replace_course(&self, entry: &CatalogEntry, chunks: &[ContentEntry]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM chunks WHERE course_title = ?1",
            params![entry.title],
        )?;

        tx.execute(
            r#"
            INSERT OR REPLACE INTO courses
            (title, instructor, link, lessons_json, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.title,
                entry.instructor,
                entry.link,
                serde_json::to_string(&entry.lessons)?,
                Self::embedding_to_bytes(&entry.embedding),
                entry.indexed_at.to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO chunks
                (course_title, chunk_index, lesson_number, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for chunk in chunks {
                stmt.execute(params![
                    chunk.course_title,
                    chunk.chunk_index,
                    chunk.lesson_number,
                    chunk.content,
                    Self::embedding_to_bytes(&chunk.embedding),
                ])?;
            }
        }

        tx.commit()?;
        info!("Stored {} chunks for course '{}'", chunks.len(), entry.title);
        Ok(chunks.len())
    }

    #[instrument(skip(self))]
    async fn delete_course(&self, course_title: &str) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let deleted = tx.execute(
            "DELETE FROM chunks WHERE course_title = ?1",
            params![course_title],
        )?;
        tx.execute("DELETE FROM courses WHERE title = ?1", params![course_title])?;
        tx.commit()?;

        info!("Deleted {} chunks for course '{}'", deleted, course_title);
        Ok(deleted)
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_content(
        &self,
        query_embedding: &[f32],
        filter: &ContentFilter,
        limit: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT course_title, chunk_index, lesson_number, content, embedding
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let entries = stmt
            .query_map(params![filter.course_title, filter.lesson_number], |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                Ok(ContentEntry {
                    course_title: row.get(0)?,
                    chunk_index: row.get(1)?,
                    lesson_number: row.get(2)?,
                    content: row.get(3)?,
                    embedding: Self::bytes_to_embedding(&embedding_bytes),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut results: Vec<SearchResult> = entries
            .into_iter()
            .map(|entry| SearchResult {
                score: cosine_similarity(query_embedding, &entry.embedding),
                entry,
            })
            .filter(|r| min_score.is_none_or(|floor| r.score >= floor))
            .collect();

        rank_content(&mut results, limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_catalog(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<CatalogMatch>> {
        let conn = self.lock()?;
        let courses = Self::query_catalog(&conn, &format!("SELECT {} FROM courses", CATALOG_COLUMNS))?;

        let mut matches: Vec<CatalogMatch> = courses
            .into_iter()
            .map(|entry| CatalogMatch {
                score: cosine_similarity(query_embedding, &entry.embedding),
                entry,
            })
            .collect();

        rank_catalog(&mut matches, limit);
        Ok(matches)
    }

    async fn get_course(&self, title: &str) -> Result<Option<CatalogEntry>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM courses WHERE title = ?1", CATALOG_COLUMNS),
                params![title],
                Self::catalog_from_row,
            )
            .optional()?;

        row.map(Self::with_lessons).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<CatalogEntry>> {
        let conn = self.lock()?;
        Self::query_catalog(
            &conn,
            &format!("SELECT {} FROM courses ORDER BY title", CATALOG_COLUMNS),
        )
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM courses;")?;
        info!("Cleared vector store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(title: &str) -> CatalogEntry {
        CatalogEntry {
            title: title.to_string(),
            instructor: Some("Ada".to_string()),
            link: Some("https://example.com/c".to_string()),
            lessons: vec![
                Lesson {
                    number: 0,
                    title: "Intro".to_string(),
                    link: Some("https://example.com/c/0".to_string()),
                },
                Lesson {
                    number: 3,
                    title: "Later".to_string(),
                    link: None,
                },
            ],
            embedding: vec![1.0, 0.0, 0.0],
            indexed_at: Utc::now(),
        }
    }

    fn chunk(course: &str, lesson: Option<u32>, index: u32, embedding: Vec<f32>) -> ContentEntry {
        ContentEntry {
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: index,
            content: format!("chunk {}", index),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .replace_course(
                &catalog("Course A"),
                &[
                    chunk("Course A", None, 0, vec![1.0, 0.0, 0.0]),
                    chunk("Course A", Some(0), 1, vec![0.0, 1.0, 0.0]),
                    chunk("Course A", Some(3), 2, vec![0.7, 0.7, 0.0]),
                ],
            )
            .await
            .unwrap();

        let course = store.get_course("Course A").await.unwrap().unwrap();
        assert_eq!(course.lessons.len(), 2);
        assert_eq!(course.lesson_link(0), Some("https://example.com/c/0"));
        assert_eq!(course.lesson_link(3), None);
        assert_eq!(course.instructor.as_deref(), Some("Ada"));

        let results = store
            .search_content(&[1.0, 0.0, 0.0], &ContentFilter::default(), 10, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].entry.lesson_number, None);

        let lesson = store
            .search_content(&[1.0, 0.0, 0.0], &ContentFilter::course("Course A").with_lesson(Some(3)), 10, None)
            .await
            .unwrap();
        assert_eq!(lesson.len(), 1);
        assert_eq!(lesson[0].entry.chunk_index, 2);

        let opposite = store
            .search_content(&[-1.0, 0.0, 0.0], &ContentFilter::default(), 10, None)
            .await
            .unwrap();
        assert_eq!(opposite.len(), 3);
        assert!(opposite.iter().any(|r| r.score < 0.0));

        let deleted = store.delete_course("Course A").await.unwrap();
        assert_eq!(deleted, 3);
        assert!(store.list_courses().await.unwrap().is_empty());
        assert!(store.get_course("Course A").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reindex_does_not_duplicate() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let chunks = vec![
            chunk("Course A", Some(0), 0, vec![1.0, 0.0, 0.0]),
            chunk("Course A", Some(0), 1, vec![0.0, 1.0, 0.0]),
        ];

        store.replace_course(&catalog("Course A"), &chunks).await.unwrap();
        store.replace_course(&catalog("Course A"), &chunks).await.unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 2);
        assert_eq!(store.list_courses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store
                .replace_course(
                    &catalog("Course A"),
                    &[chunk("Course A", Some(0), 0, vec![1.0, 0.0, 0.0])],
                )
                .await
                .unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 1);
        let matches = store.search_catalog(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(matches[0].entry.title, "Course A");

        store.clear().await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }
}
