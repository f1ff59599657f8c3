//! Tool registration and dispatch.

use super::tools::Tool;
use crate::error::{Result, SyllabusError};
use crate::llm::ToolDefinition;
use crate::rag::SourceAttribution;
use std::sync::{Arc, Mutex};

/// Named tools plus the sources produced by the most recent search.
pub struct ToolRegistry {
    tools: Vec<Arc<Tool>>,
    last_sources: Mutex<Vec<SourceAttribution>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            last_sources: Mutex::new(Vec::new()),
        }
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        if self.get(tool.name()).is_some() {
            return Err(SyllabusError::DuplicateTool(tool.name().to_string()));
        }
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    /// Tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    fn get(&self, name: &str) -> Option<&Arc<Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Execute a tool by name.
    ///
    /// The tool's result or failure is returned unchanged. Every call to a
    /// source-producing tool replaces the stored sources, with an empty list
    /// when the call fails.
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| SyllabusError::UnknownTool(name.to_string()))?;

        let result = tool.execute(arguments).await;

        if tool.produces_sources() {
            let sources = match &result {
                Ok(output) => output.sources.clone().unwrap_or_default(),
                Err(_) => Vec::new(),
            };
            *self.last_sources.lock().unwrap_or_else(|e| e.into_inner()) = sources;
        }

        result.map(|output| output.content)
    }

    /// Take the sources of the most recent search, leaving none behind.
    pub fn collect_last_sources(&self) -> Vec<SourceAttribution> {
        std::mem::take(&mut *self.last_sources.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// A registry with the same tools and its own, empty source slot.
    pub fn fork(&self) -> Self {
        Self {
            tools: self.tools.clone(),
            last_sources: Mutex::new(Vec::new()),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
