//! Test doubles for the NL2SQL pipeline

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use super::audit::AuditError;
use super::{
    AuditSink, ExecutionError, GenerationParams, KeywordGate, Nl2SqlService, Nl2SqlTranslator,
    QueryExecutor, ResultSet,
};
use crate::llm::{CompletionClient, CompletionRequest, LlmError};

/// Completion client that replies with a fixed text or error
pub struct ScriptedCompletion {
    reply: Result<String, LlmError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn replying(text: &str) -> Self {
        Self::with(Ok(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Err(LlmError::Api(message.to_string())))
    }

    fn with(reply: Result<String, LlmError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.reply.clone()
    }
}

/// Executor returning a canned result set
pub struct StaticExecutor {
    result: Result<ResultSet, ExecutionError>,
    statements: Mutex<Vec<String>>,
}

impl StaticExecutor {
    /// `n` rows with a single Problem_ID column
    pub fn problem_ids(n: i64) -> Self {
        let rows = (1..=n)
            .map(|id| {
                let mut row = Map::new();
                row.insert("Problem_ID".to_string(), Value::from(id));
                row
            })
            .collect();

        Self::with(Ok(ResultSet {
            columns: vec!["Problem_ID".to_string()],
            rows,
        }))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Err(ExecutionError(message.to_string())))
    }

    fn with(result: Result<ResultSet, ExecutionError>) -> Self {
        Self {
            result,
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for StaticExecutor {
    async fn execute(&self, statement: &str) -> Result<ResultSet, ExecutionError> {
        self.statements.lock().unwrap().push(statement.to_string());
        self.result.clone()
    }
}

/// Audit sink that remembers entries, optionally failing every write
pub struct RecordingAudit {
    fail: bool,
    attempts: AtomicUsize,
    entries: Mutex<Vec<(i32, String)>>,
    attempted: Notify,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self {
            fail: false,
            attempts: AtomicUsize::new(0),
            entries: Mutex::new(Vec::new()),
            attempted: Notify::new(),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn entries(&self) -> Vec<(i32, String)> {
        self.entries.lock().unwrap().clone()
    }

    /// Wait for the detached write to run
    pub async fn wait_for_attempt(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.attempted.notified())
            .await
            .expect("audit write was never attempted");
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, requester_id: i32, text: &str) -> Result<(), AuditError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = if self.fail {
            Err(AuditError("connection refused".to_string()))
        } else {
            self.entries
                .lock()
                .unwrap()
                .push((requester_id, text.to_string()));
            Ok(())
        };
        self.attempted.notify_one();
        outcome
    }
}

/// Pipeline with the keyword gate and the given doubles
pub fn service(
    completion: Arc<ScriptedCompletion>,
    executor: Arc<StaticExecutor>,
    audit: Arc<RecordingAudit>,
) -> Nl2SqlService {
    let translator = Nl2SqlTranslator::new(
        completion,
        GenerationParams {
            max_tokens: 200,
            temperature: 0.1,
        },
    );
    Nl2SqlService::new(translator, Arc::new(KeywordGate), executor, audit, 1)
}
