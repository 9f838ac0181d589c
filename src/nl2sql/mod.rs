//! Natural-language-to-SQL assistant
//!
//! A question moves through translate → validate → execute → record. Each
//! stage sits behind a trait so the language model, the safety gate, the
//! database and the query log can be swapped independently.

mod audit;
mod executor;
mod gate;
mod prompt;
mod translator;

#[cfg(test)]
pub mod testing;

pub use audit::{AuditSink, QueryAuditLog};
pub use executor::{ExecutionError, PgExecutor, QueryExecutor, ResultSet};
pub use gate::{KeywordGate, RejectReason, SqlGate};
pub use translator::{GenerationParams, Nl2SqlTranslator};

use axum::http::StatusCode;
use deadpool_postgres::Pool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::llm::{LlmError, OpenAiClient};

/// Message returned to callers when the gate refuses a statement
pub const UNSAFE_STATEMENT_MESSAGE: &str =
    "Generated query is not safe. Only SELECT statements are allowed.";

/// Why a question produced no result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Nl2SqlError {
    #[error("question required")]
    EmptyQuestion,

    #[error("{0}")]
    Generation(String),

    #[error("{}", UNSAFE_STATEMENT_MESSAGE)]
    UnsafeStatement { sql: String, reason: RejectReason },

    #[error("Database error: {message}")]
    Execution { sql: String, message: String },
}

impl Nl2SqlError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::EmptyQuestion | Self::UnsafeStatement { .. } | Self::Execution { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Statement to echo back; empty when nothing was generated
    pub fn sql(&self) -> &str {
        match self {
            Self::UnsafeStatement { sql, .. } | Self::Execution { sql, .. } => sql,
            Self::EmptyQuestion | Self::Generation(_) => "",
        }
    }
}

/// A question plus the account asking it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub question: String,
    pub requester_id: Option<i32>,
}

/// Executed statement and its rows
#[derive(Debug, Clone, PartialEq)]
pub struct Nl2SqlAnswer {
    pub sql: String,
    pub result: ResultSet,
}

/// The full question-answering pipeline
pub struct Nl2SqlService {
    translator: Nl2SqlTranslator,
    gate: Arc<dyn SqlGate>,
    executor: Arc<dyn QueryExecutor>,
    audit: Arc<dyn AuditSink>,
    default_account_number: i32,
}

impl Nl2SqlService {
    pub fn new(
        translator: Nl2SqlTranslator,
        gate: Arc<dyn SqlGate>,
        executor: Arc<dyn QueryExecutor>,
        audit: Arc<dyn AuditSink>,
        default_account_number: i32,
    ) -> Self {
        Self {
            translator,
            gate,
            executor,
            audit,
            default_account_number,
        }
    }

    /// Production wiring: OpenAI translator, keyword gate, Postgres executor and query log
    pub fn from_settings(pool: Pool, settings: &Settings) -> Result<Self, LlmError> {
        let client = OpenAiClient::new(&settings.llm)?;
        let translator = Nl2SqlTranslator::new(
            Arc::new(client),
            GenerationParams {
                max_tokens: settings.llm.max_tokens,
                temperature: settings.llm.temperature,
            },
        );
        let executor = PgExecutor::new(
            pool.clone(),
            Duration::from_secs(settings.database.statement_timeout_secs),
        );

        Ok(Self::new(
            translator,
            Arc::new(KeywordGate),
            Arc::new(executor),
            Arc::new(QueryAuditLog::new(pool)),
            settings.nl2sql.default_account_number,
        ))
    }

    pub async fn answer(&self, request: &TranslationRequest) -> Result<Nl2SqlAnswer, Nl2SqlError> {
        let candidate = self.translator.translate(&request.question).await?;
        let sql = candidate.normalized_text;

        let verdict = self.gate.classify(&sql);
        if let Some(reason) = verdict.reason() {
            warn!(%sql, "Rejected generated statement: {}", reason);
            return Err(Nl2SqlError::UnsafeStatement {
                reason: reason.clone(),
                sql,
            });
        }
        debug!(%sql, "Statement passed safety gate");

        let result = match self.executor.execute(&sql).await {
            Ok(result) => result,
            Err(ExecutionError(message)) => {
                warn!(%sql, "Generated statement failed: {}", message);
                return Err(Nl2SqlError::Execution { sql, message });
            }
        };

        let requester_id = request.requester_id.unwrap_or(self.default_account_number);
        audit::dispatch(self.audit.clone(), requester_id, sql.clone());

        Ok(Nl2SqlAnswer { sql, result })
    }
}
