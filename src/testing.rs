//! Deterministic test doubles for the embedding and language model seams.

use crate::embedding::Embedder;
use crate::error::{Result, SyllabusError};
use crate::llm::{GenerationRequest, LanguageModel, ModelReply, ToolInvocation};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

const DIMENSIONS: usize = 256;

/// Bag-of-words embedder: each lowercase word is hashed into a bucket.
/// Texts sharing words are similar; texts sharing none score zero.
#[derive(Debug, Default)]
pub struct WordEmbedder;

impl WordEmbedder {
    fn bucket(word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % DIMENSIONS as u64) as usize
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            v[Self::bucket(&word.to_lowercase())] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for WordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

/// Language model that replays a fixed script and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<std::result::Result<ModelReply, String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(self, answer: &str) -> Self {
        self.push(Ok(ModelReply::Text(answer.to_string())))
    }

    pub fn tool_call(self, name: &str, arguments: serde_json::Value) -> Self {
        let id = format!("call_{}", self.replies.lock().unwrap().len());
        self.push(Ok(ModelReply::ToolCalls(vec![ToolInvocation {
            id,
            name: name.to_string(),
            arguments: arguments.to_string(),
        }])))
    }

    pub fn failure(self, message: &str) -> Self {
        self.push(Err(message.to_string()))
    }

    fn push(self, reply: std::result::Result<ModelReply, String>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelReply> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(SyllabusError::OpenAI(message)),
            None => Err(SyllabusError::OpenAI("script exhausted".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A small course document used across tests.
pub const MCP_COURSE: &str = "Course Title: MCP: Build Rich-Context AI Apps with Anthropic
Course Link: https://example.com/mcp
Course Instructor: Elie Schoppik

Lesson 0: Introduction
Lesson Link: https://example.com/mcp/0
The Model Context Protocol standardizes how applications provide context to language models.

Lesson 1: Why MCP
Lesson Link: https://example.com/mcp/1
Servers expose tools, resources and prompts. Clients connect to servers over a transport.

Lesson 5: Creating an MCP Client
Clients discover server tools and call them on behalf of the model.
";

pub const PYTHON_COURSE: &str = "Course Title: Python Basics for Data Work
Course Link: https://example.com/python
Course Instructor: Grace Hopper

An introductory course about the Python language.

Lesson 1: Variables
Python variables hold values such as numbers and strings.

Lesson 2: Loops
A for loop repeats a block of Python code for each item in a list.
";
