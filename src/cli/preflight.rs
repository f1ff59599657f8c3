//! Pre-flight checks before operations that call the OpenAI API.
//!
//! Catches a missing key up front instead of failing on the first embedding
//! or chat request.

use crate::error::{Result, SyllabusError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Embeds documents.
    Ingest,
    /// Embeds the question and calls the chat model.
    Query,
    /// Embeds the query.
    Search,
    /// Reads the catalog only.
    Browse,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Ingest | Operation::Query | Operation::Search => check_api_key(std::env::var("OPENAI_API_KEY").ok()),
        Operation::Browse => Ok(()),
    }
}

fn check_api_key(key: Option<String>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(SyllabusError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(SyllabusError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_has_no_requirements() {
        assert!(check(Operation::Browse).is_ok());
    }

    #[test]
    fn test_api_key_values() {
        assert!(check_api_key(Some("sk-test".to_string())).is_ok());
        assert!(matches!(check_api_key(Some("  ".to_string())), Err(SyllabusError::Config(_))));
        assert!(matches!(check_api_key(None), Err(SyllabusError::Config(_))));
    }
}
