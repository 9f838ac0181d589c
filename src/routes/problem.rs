//! Problem catalogue route handlers

use crate::error::ApiResult;
use crate::models::{ProblemListResponse, ProblemQuery, ProblemSummary, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use tracing::debug;

/// List problems, optionally filtered by review status
pub async fn list_problems(
    State(state): State<SharedState>,
    query: Result<Query<ProblemQuery>, QueryRejection>,
) -> ApiResult<Json<SuccessResponse<ProblemListResponse>>> {
    let Query(query) = query?;
    debug!(reviewed = ?query.reviewed, "Listing problems");

    let problems = state.problems.list(query.reviewed).await?;

    Ok(Json(SuccessResponse::new(ProblemListResponse {
        problems: problems.into_iter().map(ProblemSummary::from).collect(),
    })))
}
