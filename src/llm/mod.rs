//! Language model abstraction used by the answer loop.
//!
//! The conversation is expressed in provider-neutral [`ChatMessage`]s so the
//! runner can be driven by any [`LanguageModel`], including scripted models
//! in tests.

mod openai;

pub use openai::OpenAIChatModel;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool the model may call, described by a JSON schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments object.
    pub parameters: Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned call id, echoed back with the result.
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// One message of a model conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant(String),
    /// Assistant turn that requested tool calls instead of answering.
    ToolCalls(Vec<ToolInvocation>),
    ToolResult { call_id: String, content: String },
}

/// A single model call: the conversation so far and the tools on offer.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    /// Empty means the model must answer in text.
    pub tools: Vec<ToolDefinition>,
}

/// What the model produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCalls(Vec<ToolInvocation>),
}

/// A chat model capable of tool calling.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion. Failures are reported as-is; callers do not retry.
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelReply>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}
