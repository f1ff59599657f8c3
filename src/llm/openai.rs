//! OpenAI chat completions backend.

use super::{ChatMessage, GenerationRequest, LanguageModel, ModelReply, ToolDefinition, ToolInvocation};
use crate::error::{Result, SyllabusError};
use crate::openai::create_client_with_timeout;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Chat model served by the OpenAI API.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIChatModel {
    pub fn new(model: &str, temperature: f32, max_tokens: u32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            temperature,
            max_tokens,
        })
    }

    fn convert_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
        let converted: ChatCompletionRequestMessage = match message {
            ChatMessage::System(text) => ChatCompletionRequestSystemMessageArgs::default()
                .content(text.clone())
                .build()
                .map_err(|e| SyllabusError::Generation(e.to_string()))?
                .into(),
            ChatMessage::User(text) => ChatCompletionRequestUserMessageArgs::default()
                .content(text.clone())
                .build()
                .map_err(|e| SyllabusError::Generation(e.to_string()))?
                .into(),
            ChatMessage::Assistant(text) => ChatCompletionRequestAssistantMessageArgs::default()
                .content(text.clone())
                .build()
                .map_err(|e| SyllabusError::Generation(e.to_string()))?
                .into(),
            ChatMessage::ToolCalls(calls) => ChatCompletionRequestAssistantMessageArgs::default()
                .tool_calls(
                    calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                )
                .build()
                .map_err(|e| SyllabusError::Generation(e.to_string()))?
                .into(),
            ChatMessage::ToolResult { call_id, content } => {
                ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(call_id.clone())
                    .content(content.clone())
                    .build()
                    .map_err(|e| SyllabusError::Generation(e.to_string()))?
                    .into()
            }
        };
        Ok(converted)
    }

    fn convert_tool(tool: &ToolDefinition) -> ChatCompletionTool {
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.parameters.clone()),
                strict: None,
            },
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    #[instrument(skip_all, fields(model = %self.model, tools = request.tools.len()))]
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelReply> {
        let messages = request
            .messages
            .iter()
            .map(Self::convert_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens);
        if !request.tools.is_empty() {
            args.tools(request.tools.iter().map(Self::convert_tool).collect::<Vec<_>>());
        }
        let api_request = args
            .build()
            .map_err(|e| SyllabusError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(api_request)
            .await
            .map_err(|e| SyllabusError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SyllabusError::Generation("No response from model".to_string()))?;

        match choice.message.tool_calls {
            Some(calls) if !calls.is_empty() => {
                debug!("Model requested {} tool call(s)", calls.len());
                Ok(ModelReply::ToolCalls(
                    calls
                        .into_iter()
                        .map(|call| ToolInvocation {
                            id: call.id,
                            name: call.function.name,
                            arguments: call.function.arguments,
                        })
                        .collect(),
                ))
            }
            _ => Ok(ModelReply::Text(choice.message.content.unwrap_or_default())),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
