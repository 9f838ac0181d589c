// Database services for problems, solutions and the query log
//
// Thin wrappers around parameterized statements

use crate::db::queries::{
    GET_SOLUTION, INSERT_SOLUTION, LIST_PROBLEMS, LIST_QUERY_LOG, UPDATE_SOLUTION,
};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;

// Problem record with its tags resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbProblem {
    pub problem_id: i32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty_level: Option<String>,
    pub sql_concept: Option<String>,
    pub reviewed: bool,
}

// Solution record from database
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbSolution {
    pub solution_id: i32,
    pub problem_id: i32,
    pub description: Option<String>,
}

// Query log record from database
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbQueryLogEntry {
    pub query_text: String,
    pub query_time: Option<DateTime<Utc>>,
}

// Problem catalogue reads
pub struct ProblemService {
    pool: Pool,
}

impl ProblemService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    // All problems, or only those with the given review status
    pub async fn list(&self, reviewed: Option<bool>) -> Result<Vec<DbProblem>, AppError> {
        let client = self.pool.get().await?;

        let rows = client.query(LIST_PROBLEMS, &[&reviewed]).await?;

        Ok(rows
            .into_iter()
            .map(|r| DbProblem {
                problem_id: r.get("problem_id"),
                title: r.get("title"),
                description: r.get("description"),
                difficulty_level: r.get("difficulty_level"),
                sql_concept: r.get("sql_concept"),
                reviewed: r.get("reviewed"),
            })
            .collect())
    }
}

// Solution service for database operations
pub struct SolutionService {
    pool: Pool,
}

impl SolutionService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    // Find the solution attached to a problem
    pub async fn find_by_problem(&self, problem_id: i32) -> Result<Option<DbSolution>, AppError> {
        let client = self.pool.get().await?;

        let row = client.query_opt(GET_SOLUTION, &[&problem_id]).await?;

        Ok(row.map(|r| DbSolution {
            solution_id: r.get("solution_id"),
            problem_id: r.get("problem_id"),
            description: r.get("solution_description"),
        }))
    }

    // Add a solution for an existing problem
    pub async fn create(&self, problem_id: i32, description: &str) -> Result<(), AppError> {
        let client = self.pool.get().await?;

        client
            .execute(INSERT_SOLUTION, &[&problem_id, &description])
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
                    AppError::BadRequest(format!("Problem {} does not exist", problem_id))
                } else {
                    AppError::Database(e)
                }
            })?;

        Ok(())
    }

    // Replace the description; returns false when the problem has no solution
    pub async fn update(&self, problem_id: i32, description: &str) -> Result<bool, AppError> {
        let client = self.pool.get().await?;

        let updated = client
            .execute(UPDATE_SOLUTION, &[&description, &problem_id])
            .await?;

        Ok(updated > 0)
    }
}

// Read side of the assistant query log
pub struct QueryHistoryService {
    pool: Pool,
}

impl QueryHistoryService {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    // Newest entries first
    pub async fn list_for_account(
        &self,
        account_number: i32,
        limit: i64,
    ) -> Result<Vec<DbQueryLogEntry>, AppError> {
        let client = self.pool.get().await?;

        let rows = client
            .query(LIST_QUERY_LOG, &[&account_number, &limit])
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| DbQueryLogEntry {
                query_text: r.get("query_text"),
                query_time: r.get("query_time"),
            })
            .collect())
    }
}
