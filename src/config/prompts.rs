//! Prompt templates for Syllabus.
//!
//! Prompts can be customized by placing an `assistant.toml` file in the
//! custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"))
}

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the course assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    pub system: String,
    /// Wraps the user's question; `{{query}}` is replaced with it.
    pub query: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant specialized in course materials and educational content, with tools for looking up course information.

Available tools:
1. search_course_content: search course materials for specific content or details
2. get_course_outline: get a course's title, link and complete numbered lesson list

Tool selection:
- Outline questions (syllabus, structure, which lessons, course overview): use get_course_outline
- Content questions (specific topics, details, explanations): use search_course_content
- General knowledge questions: answer without tools
- One round of tool calls per question; synthesize the results into a single answer
- If a tool finds nothing, say so plainly

Response protocol:
- Answer directly without meta-commentary
- Do not mention "based on the search results" or describe the search process
- For outline answers include the course title, its link and every lesson with number and title

All responses must be brief, educational, clear and example-supported when helpful."#
                .to_string(),
            query: "Answer this question about course materials: {{query}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let assistant_path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Only placeholders in `template` are replaced; substituted values are
    /// never scanned again. Unknown placeholders are left as they are.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        placeholder()
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The system prompt with custom variables applied.
    pub fn system_prompt(&self) -> String {
        self.render_with_custom(&self.assistant.system, &HashMap::new())
    }

    /// Wrap a user question in the query template.
    pub fn query_prompt(&self, query: &str) -> String {
        let vars = HashMap::from([("query".to_string(), query.to_string())]);
        self.render_with_custom(&self.assistant.query, &vars)
    }
}
