//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::db::{ProblemService, QueryHistoryService, SolutionService};
use crate::nl2sql::Nl2SqlService;
use deadpool_postgres::Pool;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Question → SQL → rows pipeline
    pub nl2sql: Nl2SqlService,

    /// Problem catalogue
    pub problems: ProblemService,

    /// Solution lookups and edits
    pub solutions: SolutionService,

    /// Read side of the assistant query log
    pub query_history: QueryHistoryService,
}

impl AppState {
    pub fn new(pool: Pool, nl2sql: Nl2SqlService) -> Self {
        Self {
            nl2sql,
            problems: ProblemService::new(pool.clone()),
            solutions: SolutionService::new(pool.clone()),
            query_history: QueryHistoryService::new(pool),
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
