//! Problem catalogue DTOs

use crate::db::service::DbProblem;
use serde::{Deserialize, Serialize};

/// `?reviewed=true|false`; absent lists every problem
#[derive(Debug, Default, Deserialize)]
pub struct ProblemQuery {
    pub reviewed: Option<bool>,
}

/// One problem as the frontend lists it
#[derive(Debug, Serialize)]
pub struct ProblemSummary {
    #[serde(rename = "pId")]
    pub problem_id: i32,
    #[serde(rename = "pTitle")]
    pub title: Option<String>,
    #[serde(rename = "pDescription")]
    pub description: Option<String>,
    #[serde(rename = "difficultyLevel")]
    pub difficulty_level: Option<String>,
    #[serde(rename = "sqlConcept")]
    pub sql_concept: Option<String>,
    pub reviewed: bool,
}

impl From<DbProblem> for ProblemSummary {
    fn from(problem: DbProblem) -> Self {
        Self {
            problem_id: problem.problem_id,
            title: problem.title,
            description: problem.description,
            difficulty_level: problem.difficulty_level,
            sql_concept: problem.sql_concept,
            reviewed: problem.reviewed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProblemListResponse {
    pub problems: Vec<ProblemSummary>,
}
