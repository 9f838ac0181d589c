//! Solution DTOs

use crate::db::service::DbSolution;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to add a solution
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSolutionRequest {
    #[serde(rename = "pId")]
    #[validate(range(min = 1, message = "Problem id must be positive"))]
    pub problem_id: i32,

    #[serde(rename = "sDescription")]
    #[validate(length(min = 1, message = "Solution description is required"))]
    pub description: String,
}

/// Request to replace a solution's description
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSolutionRequest {
    #[serde(rename = "sDescription")]
    #[validate(length(min = 1, message = "Solution description is required"))]
    pub description: String,
}

/// Solution as returned to the frontend
#[derive(Debug, Serialize)]
pub struct SolutionResponse {
    pub success: bool,
    #[serde(rename = "sId")]
    pub solution_id: i32,
    #[serde(rename = "pId")]
    pub problem_id: i32,
    #[serde(rename = "sDescription")]
    pub description: Option<String>,
}

impl From<DbSolution> for SolutionResponse {
    fn from(solution: DbSolution) -> Self {
        Self {
            success: true,
            solution_id: solution.solution_id,
            problem_id: solution.problem_id,
            description: solution.description,
        }
    }
}
