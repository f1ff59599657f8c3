//! The answer loop: one model call, at most one round of tool calls, and a
//! final model call without tools.

use super::registry::ToolRegistry;
use crate::error::{Result, SyllabusError};
use crate::llm::{ChatMessage, GenerationRequest, LanguageModel, ModelReply, ToolInvocation};
use crate::rag::{Role, SourceAttribution, Turn};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Progress of a single query through the loop.
enum State {
    Init,
    FirstCall(GenerationRequest),
    ToolRequested {
        request: GenerationRequest,
        calls: Vec<ToolInvocation>,
    },
    ToolExecuted(GenerationRequest),
    FinalCall(GenerationRequest),
    Done(String),
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub answer: String,
    /// Sources of the most recent search in this run.
    pub sources: Vec<SourceAttribution>,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Record of a tool call made during a run.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Text handed back to the model, including failure messages.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// Drives a [`LanguageModel`] through the tool loop.
pub struct Runner {
    model: Arc<dyn LanguageModel>,
    system_prompt: String,
}

impl Runner {
    pub fn new(model: Arc<dyn LanguageModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            system_prompt: system_prompt.into(),
        }
    }

    /// Answer `prompt` given prior `history`, using the tools in `registry`.
    ///
    /// Any model failure ends the run with [`SyllabusError::Generation`].
    /// Tool failures do not: they are handed to the model as text.
    #[instrument(skip_all, fields(model = self.model.model_name()))]
    pub async fn run(&self, registry: &ToolRegistry, history: &[Turn], prompt: &str) -> Result<RunOutcome> {
        let mut tool_calls = Vec::new();
        let mut state = State::Init;

        let answer = loop {
            state = match state {
                State::Init => State::FirstCall(self.initial_request(registry, history, prompt)),

                State::FirstCall(request) => match self.call(&request).await? {
                    ModelReply::Text(text) => State::Done(text),
                    ModelReply::ToolCalls(calls) => State::ToolRequested { request, calls },
                },

                State::ToolRequested { mut request, calls } => {
                    request.messages.push(ChatMessage::ToolCalls(calls.clone()));
                    for call in calls {
                        let record = Self::execute_tool(registry, call.name, call.arguments).await;
                        request.messages.push(ChatMessage::ToolResult {
                            call_id: call.id,
                            content: record.result.clone(),
                        });
                        tool_calls.push(record);
                    }
                    State::ToolExecuted(request)
                }

                State::ToolExecuted(mut request) => {
                    request.tools.clear();
                    State::FinalCall(request)
                }

                State::FinalCall(request) => match self.call(&request).await? {
                    ModelReply::Text(text) => State::Done(text),
                    ModelReply::ToolCalls(calls) => {
                        return Err(SyllabusError::Generation(format!(
                            "model requested {} more tool call(s) after the tool round",
                            calls.len()
                        )))
                    }
                },

                State::Done(text) => break text,
            };
            debug!("Runner state: {:?}", StateName::from(&state));
        };

        if answer.trim().is_empty() {
            return Err(SyllabusError::Generation("model returned an empty answer".to_string()));
        }

        info!("Answered with {} tool call(s)", tool_calls.len());
        Ok(RunOutcome {
            answer,
            sources: registry.collect_last_sources(),
            tool_calls,
        })
    }

    fn initial_request(&self, registry: &ToolRegistry, history: &[Turn], prompt: &str) -> GenerationRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::System(self.system_prompt.clone()));
        messages.extend(history.iter().map(|turn| match turn.role {
            Role::User => ChatMessage::User(turn.content.clone()),
            Role::Assistant => ChatMessage::Assistant(turn.content.clone()),
        }));
        messages.push(ChatMessage::User(prompt.to_string()));

        GenerationRequest {
            messages,
            tools: registry.definitions(),
        }
    }

    async fn call(&self, request: &GenerationRequest) -> Result<ModelReply> {
        self.model.generate(request).await.map_err(|e| match e {
            SyllabusError::Generation(_) => e,
            other => SyllabusError::Generation(other.to_string()),
        })
    }

    async fn execute_tool(registry: &ToolRegistry, name: String, arguments: String) -> ToolCallRecord {
        let result = match registry.execute(&name, &arguments).await {
            Ok(output) => output,
            Err(e @ SyllabusError::CourseNotFound(_)) => e.to_string(),
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                format!("Tool error: {}", e)
            }
        };

        ToolCallRecord {
            name,
            arguments,
            result,
        }
    }
}

/// State label for logs, without the request payloads.
#[derive(Debug)]
enum StateName {
    Init,
    FirstCall,
    ToolRequested,
    ToolExecuted,
    FinalCall,
    Done,
}

impl From<&State> for StateName {
    fn from(state: &State) -> Self {
        match state {
            State::Init => StateName::Init,
            State::FirstCall(_) => StateName::FirstCall,
            State::ToolRequested { .. } => StateName::ToolRequested,
            State::ToolExecuted(_) => StateName::ToolExecuted,
            State::FinalCall(_) => StateName::FinalCall,
            State::Done(_) => StateName::Done,
        }
    }
}
