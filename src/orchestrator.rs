//! Pipeline orchestrator for Syllabus.
//!
//! Wires settings, the semantic index, tools, conversation history and the
//! language model together. Loading a corpus and answering a query both go
//! through here.

use crate::agent::{OutlineTool, Runner, SearchTool, Tool, ToolRegistry};
use crate::chunking::TextChunker;
use crate::config::{Prompts, Settings, StoreProvider};
use crate::course::parse_file;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, SyllabusError};
use crate::llm::{LanguageModel, OpenAIChatModel};
use crate::rag::{CourseAnalytics, QueryResponse, SemanticIndex, SessionStore};
use crate::vector_store::{MemoryVectorStore, SqliteVectorStore, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// File extensions treated as course documents.
const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md"];

/// The main orchestrator for the Syllabus pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    chunker: TextChunker,
    index: Arc<SemanticIndex>,
    tools: ToolRegistry,
    runner: Runner,
    sessions: SessionStore,
}

impl Orchestrator {
    /// Create an orchestrator backed by OpenAI and the configured store.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);

        let store: Arc<dyn VectorStore> = match settings.vector_store.provider {
            StoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
            StoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
        };

        let model: Arc<dyn LanguageModel> = Arc::new(OpenAIChatModel::new(
            &settings.generation.model,
            settings.generation.temperature,
            settings.generation.max_tokens,
            settings.request_timeout(),
        )?);

        Self::with_components(settings, prompts, store, embedder, model)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        settings.validate()?;

        let chunker = TextChunker::new(settings.chunking_config())?;
        let index = Arc::new(SemanticIndex::new(store, embedder, settings.index_config()));

        let mut tools = ToolRegistry::new();
        tools.register(Tool::Search(SearchTool::new(index.clone())))?;
        tools.register(Tool::Outline(OutlineTool::new(index.clone())))?;

        let runner = Runner::new(model, prompts.system_prompt());
        let sessions = SessionStore::new(
            settings.session.max_history,
            settings.session_ttl(),
            settings.session.max_sessions,
        );

        Ok(Self {
            settings,
            prompts,
            chunker,
            index,
            tools,
            runner,
            sessions,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Parse, chunk and index one course document.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_document(&self, path: &Path) -> Result<IngestResult> {
        let doc = parse_file(path)?;
        let chunks = self.chunker.chunk_document(&doc);
        let chunks_indexed = self.index.index(&doc.course, &chunks).await?;

        Ok(IngestResult {
            course_title: doc.course.title,
            lessons: doc.course.lessons.len(),
            chunks_indexed,
        })
    }

    /// Load every course document in `dir`.
    ///
    /// A document that fails to load is logged and skipped; the rest of the
    /// folder still loads. Courses already in the index are skipped unless
    /// `clear_existing` wipes the index first.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn ingest_folder(&self, dir: &Path, clear_existing: bool) -> Result<FolderReport> {
        if !dir.is_dir() {
            return Err(SyllabusError::InvalidInput(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        if clear_existing {
            info!("Clearing existing index");
            self.index.clear().await?;
        }

        let mut report = FolderReport::default();

        for path in document_files(dir)? {
            let doc = match parse_file(&path) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.failed.push((path, e.to_string()));
                    continue;
                }
            };

            if !clear_existing {
                match self.index.is_indexed(&doc.course.title).await {
                    Ok(true) => {
                        info!("Course '{}' is already indexed, skipping", doc.course.title);
                        report.skipped.push(doc.course.title);
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Failed to check {}: {}", path.display(), e);
                        report.failed.push((path, e.to_string()));
                        continue;
                    }
                }
            }

            let chunks = self.chunker.chunk_document(&doc);
            match self.index.index(&doc.course, &chunks).await {
                Ok(chunks_indexed) => report.ingested.push(IngestResult {
                    course_title: doc.course.title,
                    lessons: doc.course.lessons.len(),
                    chunks_indexed,
                }),
                Err(e) => {
                    warn!("Failed to index {}: {}", path.display(), e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        info!(
            "Loaded {} courses ({} chunks), skipped {}, failed {}",
            report.ingested.len(),
            report.total_chunks(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Answer a question within a session.
    ///
    /// History is only updated when an answer is produced; a failed query
    /// leaves the session untouched.
    #[instrument(skip(self, text))]
    pub async fn query(&self, session_id: &str, text: &str) -> Result<QueryResponse> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SyllabusError::InvalidInput("Query must not be empty".to_string()));
        }

        let history = self.sessions.get(session_id);
        let prompt = self.prompts.query_prompt(text);
        let registry = self.tools.fork();

        let outcome = self.runner.run(&registry, &history, &prompt).await?;
        for call in &outcome.tool_calls {
            info!("Tool call: {}", call);
        }

        self.sessions.append_exchange(session_id, text, &outcome.answer);

        Ok(QueryResponse {
            answer: outcome.answer,
            sources: outcome.sources,
        })
    }

    pub fn create_session(&self) -> String {
        self.sessions.create_session()
    }

    pub fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.clear(session_id)
    }

    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        self.index.analytics().await
    }
}

/// Course document files directly inside `dir`, sorted by path.
fn document_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_document = path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_document {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Result of loading one course document.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub course_title: String,
    pub lessons: usize,
    pub chunks_indexed: usize,
}

/// Result of loading a folder of course documents.
#[derive(Debug, Default)]
pub struct FolderReport {
    pub ingested: Vec<IngestResult>,
    /// Titles of courses that were already indexed.
    pub skipped: Vec<String>,
    /// Documents that could not be loaded, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl FolderReport {
    pub fn total_chunks(&self) -> usize {
        self.ingested.iter().map(|r| r.chunks_indexed).sum()
    }
}
