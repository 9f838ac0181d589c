//! Best-effort query log
//!
//! Records which account ran which statement. Writes happen on a detached
//! task so the response never waits on them, and failures only reach the log.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::queries::INSERT_QUERY_LOG;

#[derive(Error, Debug)]
#[error("Failed to save query: {0}")]
pub struct AuditError(pub String);

/// Destination for query log entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, requester_id: i32, text: &str) -> Result<(), AuditError>;
}

/// Writes entries to the QUERY table with a server-side timestamp
pub struct QueryAuditLog {
    pool: Pool,
}

impl QueryAuditLog {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for QueryAuditLog {
    async fn record(&self, requester_id: i32, text: &str) -> Result<(), AuditError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| AuditError(e.to_string()))?;

        client
            .execute(INSERT_QUERY_LOG, &[&requester_id, &text])
            .await
            .map_err(|e| AuditError(e.to_string()))?;

        Ok(())
    }
}

/// Record in the background; the returned handle is only awaited by tests
pub fn dispatch(sink: Arc<dyn AuditSink>, requester_id: i32, text: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        match sink.record(requester_id, &text).await {
            Ok(()) => debug!(requester_id, "Query recorded"),
            Err(e) => warn!(requester_id, "{}", e),
        }
    })
}
