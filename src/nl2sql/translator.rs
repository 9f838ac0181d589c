//! Natural language to SQL translation

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::sync::Arc;
use tracing::{debug, error};

use super::prompt::build_messages;
use super::Nl2SqlError;
use crate::llm::{CompletionClient, CompletionRequest};

// Opening fence with an optional language tag on its own line
static OPENING_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```[ \t]*(?:(?P<tag>[A-Za-z][\w+-]*)[ \t]*)?\r?\n").expect("valid regex")
});
// ```sql followed directly by the query on the same line
static INLINE_SQL_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```sql\b\s*").expect("valid regex"));
static BARE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*").expect("valid regex"));

/// Model output before and after markdown cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateStatement {
    pub raw_text: String,
    pub normalized_text: String,
}

/// Sampling parameters sent with every generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Turns a question into a candidate SQL statement via the completion client
pub struct Nl2SqlTranslator {
    client: Arc<dyn CompletionClient>,
    params: GenerationParams,
}

impl Nl2SqlTranslator {
    pub fn new(client: Arc<dyn CompletionClient>, params: GenerationParams) -> Self {
        Self { client, params }
    }

    /// One upstream call per question; failures are not retried
    pub async fn translate(&self, question: &str) -> Result<CandidateStatement, Nl2SqlError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Nl2SqlError::EmptyQuestion);
        }

        let request = CompletionRequest {
            messages: build_messages(question),
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
        };

        let raw_text = self.client.complete(&request).await.map_err(|e| {
            error!("SQL generation failed: {}", e);
            Nl2SqlError::Generation(e.to_string())
        })?;

        let normalized_text = strip_code_fences(&raw_text);
        debug!(sql = %normalized_text, "Generated candidate statement");

        Ok(CandidateStatement {
            raw_text,
            normalized_text,
        })
    }
}

/// Words that open a statement, so never a fence language tag
const STATEMENT_KEYWORDS: [&str; 13] = [
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE",
    "EXPLAIN", "SHOW", "VALUES", "TABLE",
];

/// Remove markdown code fences and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    let text = OPENING_FENCE.replace_all(text.trim(), |caps: &Captures| match caps.name("tag") {
        Some(tag)
            if STATEMENT_KEYWORDS
                .iter()
                .any(|kw| kw.eq_ignore_ascii_case(tag.as_str())) =>
        {
            format!("{}\n", tag.as_str())
        }
        _ => String::new(),
    });
    let text = INLINE_SQL_FENCE.replace_all(&text, "");
    let text = BARE_FENCE.replace_all(&text, "");
    text.trim().to_string()
}
