//! Chat assistant DTOs

use crate::db::service::DbQueryLogEntry;
use crate::nl2sql::{Nl2SqlAnswer, Nl2SqlError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Request to answer a natural-language question
#[derive(Debug, Deserialize, Validate)]
pub struct Nl2SqlRequest {
    #[serde(default)]
    #[validate(length(max = 2000, message = "Question must be at most 2000 characters"))]
    pub question: Option<String>,

    #[serde(default)]
    #[validate(range(min = 1, message = "Account number must be positive"))]
    pub account_number: Option<i32>,
}

impl Nl2SqlRequest {
    /// Question text, if one with content was sent
    pub fn question(&self) -> Option<&str> {
        self.question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// Answer body; errors reuse the same shape with empty results
#[derive(Debug, Serialize, PartialEq)]
pub struct Nl2SqlResponse {
    pub sql: String,
    pub results: Vec<Map<String, Value>>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

impl From<Nl2SqlAnswer> for Nl2SqlResponse {
    fn from(answer: Nl2SqlAnswer) -> Self {
        Self {
            sql: answer.sql,
            row_count: Some(answer.result.row_count()),
            columns: Some(answer.result.columns),
            results: answer.result.rows,
            error: None,
        }
    }
}

impl From<&Nl2SqlError> for Nl2SqlResponse {
    fn from(err: &Nl2SqlError) -> Self {
        Self {
            sql: err.sql().to_string(),
            results: Vec::new(),
            error: Some(err.to_string()),
            row_count: None,
            columns: None,
        }
    }
}

/// Query for history listing
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

impl HistoryQuery {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// One logged assistant query
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryLogEntry {
    pub query_text: String,
    pub query_time: Option<DateTime<Utc>>,
}

impl From<DbQueryLogEntry> for QueryLogEntry {
    fn from(entry: DbQueryLogEntry) -> Self {
        Self {
            query_text: entry.query_text,
            query_time: entry.query_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryHistoryResponse {
    pub queries: Vec<QueryLogEntry>,
}
