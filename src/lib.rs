//! Syllabus - question answering over course materials
//!
//! A retrieval-augmented assistant that answers questions about a folder of
//! course documents, citing the lessons it drew from.
//!
//! # Overview
//!
//! Syllabus allows you to:
//! - Load course transcripts into a persistent semantic index
//! - Ask questions and get answers grounded in the matching lessons
//! - Keep short conversations going per session
//! - Look up a course outline by a loose course name
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `course` - Course document model and parser
//! - `chunking` - Sentence-aware text chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Catalog and content collections
//! - `rag` - Semantic index, sources and conversation history
//! - `llm` - Language model abstraction with tool calling
//! - `agent` - Course tools, tool registry and the answer loop
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use syllabus::config::Settings;
//! use syllabus::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.ingest_folder("./docs".as_ref(), false).await?;
//!     println!("Indexed {} chunks", report.total_chunks());
//!
//!     let session = orchestrator.create_session();
//!     let response = orchestrator.query(&session, "What is MCP?").await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod course;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use error::{Result, SyllabusError};
