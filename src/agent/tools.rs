//! Tools the model can call during a query.

use crate::error::{Result, SyllabusError};
use crate::llm::ToolDefinition;
use crate::rag::{SemanticIndex, SourceAttribution};
use crate::vector_store::ContentFilter;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const SEARCH_TOOL: &str = "search_course_content";
pub const OUTLINE_TOOL: &str = "get_course_outline";

/// Result of a successful tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text handed back to the model.
    pub content: String,
    /// Attributions, for tools that produce them.
    pub sources: Option<Vec<SourceAttribution>>,
}

impl ToolOutput {
    fn text(content: String) -> Self {
        Self {
            content,
            sources: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

fn parse_args<'de, T: Deserialize<'de>>(tool: &str, arguments: &'de str) -> Result<T> {
    serde_json::from_str(arguments)
        .map_err(|e| SyllabusError::ToolArguments(format!("{}: {}", tool, e)))
}

/// Semantic search over course content with optional course and lesson
/// filters.
pub struct SearchTool {
    index: Arc<SemanticIndex>,
}

impl SearchTool {
    pub fn new(index: Arc<SemanticIndex>) -> Self {
        Self { index }
    }

    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_TOOL.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolOutput> {
        let args: SearchArgs = parse_args(SEARCH_TOOL, arguments)?;

        let course_title = match &args.course_name {
            Some(name) => Some(
                self.index
                    .resolve_course_name(name)
                    .await?
                    .ok_or_else(|| SyllabusError::CourseNotFound(name.clone()))?,
            ),
            None => None,
        };

        let filter = ContentFilter {
            course_title,
            lesson_number: args.lesson_number,
        };
        let results = self.index.search(&args.query, &filter, None).await?;

        if results.is_empty() {
            let mut message = "No relevant content found".to_string();
            if let Some(name) = &args.course_name {
                message.push_str(&format!(" in course '{}'", name));
            }
            if let Some(n) = args.lesson_number {
                message.push_str(&format!(" in lesson {}", n));
            }
            message.push('.');
            return Ok(ToolOutput {
                content: message,
                sources: Some(Vec::new()),
            });
        }

        let mut links: HashMap<(String, u32), Option<String>> = HashMap::new();
        let mut blocks = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for result in results {
            let entry = result.entry;
            let lesson_link = match entry.lesson_number {
                Some(n) => {
                    let key = (entry.course_title.clone(), n);
                    if !links.contains_key(&key) {
                        let link = self.index.lesson_link(&entry.course_title, n).await?;
                        links.insert(key.clone(), link);
                    }
                    links.get(&key).cloned().flatten()
                }
                None => None,
            };

            let source = SourceAttribution {
                course_title: entry.course_title,
                lesson_number: entry.lesson_number,
                lesson_link,
            };
            blocks.push(format!("[{}] {}", source.label(), entry.content));
            sources.push(source);
        }

        debug!("Search tool returned {} results", sources.len());
        Ok(ToolOutput {
            content: blocks.join("\n\n"),
            sources: Some(sources),
        })
    }
}

/// Course outline lookup: title, link, instructor and lesson list.
pub struct OutlineTool {
    index: Arc<SemanticIndex>,
}

impl OutlineTool {
    pub fn new(index: Arc<SemanticIndex>) -> Self {
        Self { index }
    }

    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: OUTLINE_TOOL.to_string(),
            description: "Get the outline of a course: its title, link, instructor and numbered lesson list"
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolOutput> {
        let args: OutlineArgs = parse_args(OUTLINE_TOOL, arguments)?;
        let course = self.index.course_outline(&args.course_name).await?;

        let mut lines = vec![format!("Course: {}", course.title)];
        if let Some(link) = &course.link {
            lines.push(format!("Course Link: {}", link));
        }
        if let Some(instructor) = &course.instructor {
            lines.push(format!("Course Instructor: {}", instructor));
        }
        lines.push(String::new());
        lines.push(format!("Lessons ({}):", course.lessons.len()));
        lines.extend(
            course
                .lessons
                .iter()
                .map(|l| format!("Lesson {}: {}", l.number, l.title)),
        );

        Ok(ToolOutput::text(lines.join("\n")))
    }
}

/// Every tool the assistant knows about.
pub enum Tool {
    Search(SearchTool),
    Outline(OutlineTool),
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Search(_) => SEARCH_TOOL,
            Tool::Outline(_) => OUTLINE_TOOL,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            Tool::Search(_) => SearchTool::definition(),
            Tool::Outline(_) => OutlineTool::definition(),
        }
    }

    /// Whether calls to this tool replace the registry's source list.
    pub fn produces_sources(&self) -> bool {
        matches!(self, Tool::Search(_))
    }

    /// Run the tool against raw JSON arguments.
    pub async fn execute(&self, arguments: &str) -> Result<ToolOutput> {
        info!("Executing tool {} with args: {}", self.name(), arguments);
        match self {
            Tool::Search(tool) => tool.execute(arguments).await,
            Tool::Outline(tool) => tool.execute(arguments).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkingConfig, TextChunker};
    use crate::course::parse_document;
    use crate::rag::IndexConfig;
    use crate::testing::{WordEmbedder, MCP_COURSE, PYTHON_COURSE};
    use crate::vector_store::MemoryVectorStore;

    async fn loaded_index() -> Arc<SemanticIndex> {
        let index = Arc::new(SemanticIndex::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(WordEmbedder),
            IndexConfig::default(),
        ));
        let chunker = TextChunker::new(ChunkingConfig::default()).unwrap();
        for text in [MCP_COURSE, PYTHON_COURSE] {
            let doc = parse_document(text).unwrap();
            index.index(&doc.course, &chunker.chunk_document(&doc)).await.unwrap();
        }
        index
    }

    #[tokio::test]
    async fn test_search_formats_results_and_sources() {
        let tool = Tool::Search(SearchTool::new(loaded_index().await));
        let output = tool
            .execute(r#"{"query": "servers expose tools", "course_name": "MCP", "lesson_number": 1}"#)
            .await
            .unwrap();

        assert_eq!(
            output.content,
            "[MCP: Build Rich-Context AI Apps with Anthropic - Lesson 1] \
             Course MCP: Build Rich-Context AI Apps with Anthropic Lesson 1 content: \
             Servers expose tools, resources and prompts. Clients connect to servers over a transport."
        );
        let sources = output.sources.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].lesson_number, Some(1));
        assert_eq!(sources[0].lesson_link.as_deref(), Some("https://example.com/mcp/1"));
    }

    #[tokio::test]
    async fn test_search_without_lesson_uses_course_label() {
        let tool = Tool::Search(SearchTool::new(loaded_index().await));
        let output = tool
            .execute(r#"{"query": "introductory course language", "course_name": "Python Basics"}"#)
            .await
            .unwrap();

        let sources = output.sources.unwrap();
        let preamble = sources.iter().position(|s| s.lesson_number.is_none()).unwrap();
        assert_eq!(sources[preamble].label(), "Python Basics for Data Work");
        assert!(output.content.contains("[Python Basics for Data Work] "));
        assert!(sources.iter().all(|s| s.course_title == "Python Basics for Data Work"));
    }

    #[tokio::test]
    async fn test_search_unknown_course_is_not_found() {
        let tool = Tool::Search(SearchTool::new(loaded_index().await));
        let err = tool
            .execute(r#"{"query": "anything", "course_name": "Quantum Gardening"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, SyllabusError::CourseNotFound(_)));
        assert_eq!(err.to_string(), "No course found matching 'Quantum Gardening'");
    }

    #[tokio::test]
    async fn test_search_with_no_hits_reports_filters() {
        let tool = Tool::Search(SearchTool::new(loaded_index().await));
        let output = tool
            .execute(r#"{"query": "variables", "course_name": "Python Basics", "lesson_number": 9}"#)
            .await
            .unwrap();
        assert_eq!(
            output.content,
            "No relevant content found in course 'Python Basics' in lesson 9."
        );
        assert_eq!(output.sources, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_bad_arguments_are_rejected() {
        let tool = Tool::Search(SearchTool::new(loaded_index().await));
        assert!(matches!(
            tool.execute(r#"{"course_name": "MCP"}"#).await,
            Err(SyllabusError::ToolArguments(_))
        ));
        assert!(matches!(
            tool.execute("not json").await,
            Err(SyllabusError::ToolArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_outline() {
        let tool = Tool::Outline(OutlineTool::new(loaded_index().await));
        let output = tool.execute(r#"{"course_name": "MCP"}"#).await.unwrap();

        assert_eq!(
            output.content,
            "Course: MCP: Build Rich-Context AI Apps with Anthropic\n\
             Course Link: https://example.com/mcp\n\
             Course Instructor: Elie Schoppik\n\
             \n\
             Lessons (3):\n\
             Lesson 0: Introduction\n\
             Lesson 1: Why MCP\n\
             Lesson 5: Creating an MCP Client"
        );
        assert_eq!(output.sources, None);
        assert!(!tool.produces_sources());
    }

    #[test]
    fn test_definitions() {
        let schema = SearchTool::definition();
        assert_eq!(schema.name, SEARCH_TOOL);
        assert_eq!(schema.parameters["required"], serde_json::json!(["query"]));
        assert_eq!(OutlineTool::definition().name, OUTLINE_TOOL);
    }
}
