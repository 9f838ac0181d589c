//! Solution route handlers

use crate::error::{not_found_error, validation_error, ApiResult};
use crate::models::{
    CreateSolutionRequest, MessageResponse, SolutionResponse, UpdateSolutionRequest,
};
use crate::state::SharedState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use tracing::{debug, info};
use validator::Validate;

/// Get the reference solution for a problem
pub async fn get_solution(
    State(state): State<SharedState>,
    path: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<SolutionResponse>> {
    let Path(problem_id) = path?;
    debug!("Fetching solution for problem {}", problem_id);

    let solution = state
        .solutions
        .find_by_problem(problem_id)
        .await?
        .ok_or_else(|| not_found_error("Solution not found"))?;

    Ok(Json(SolutionResponse::from(solution)))
}

/// Add a solution to a problem
pub async fn add_solution(
    State(state): State<SharedState>,
    payload: Result<Json<CreateSolutionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(payload) = payload?;
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    state
        .solutions
        .create(payload.problem_id, &payload.description)
        .await?;

    info!("Solution added for problem {}", payload.problem_id);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "Solution added for problem {}.",
            payload.problem_id
        ))),
    ))
}

/// Replace the description of a problem's solution
pub async fn update_solution(
    State(state): State<SharedState>,
    path: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateSolutionRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(problem_id) = path?;
    let Json(payload) = payload?;
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    if !state.solutions.update(problem_id, &payload.description).await? {
        return Err(not_found_error("Solution not found"));
    }

    info!("Solution updated for problem {}", problem_id);

    Ok(Json(MessageResponse::new(format!(
        "Solution updated for problem {}.",
        problem_id
    ))))
}
