//! Chat assistant route handlers

use crate::error::{validation_error, ApiResult};
use crate::models::{
    HistoryQuery, Nl2SqlRequest, Nl2SqlResponse, QueryHistoryResponse, QueryLogEntry,
    SuccessResponse,
};
use crate::nl2sql::{Nl2SqlError, TranslationRequest};
use crate::state::SharedState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info};
use validator::Validate;

/// Answer a natural-language question with SQL and its rows
pub async fn nl2sql(
    State(state): State<SharedState>,
    payload: Result<Json<Nl2SqlRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!("Rejected NL2SQL body: {}", rejection.body_text());
            return bad_request(rejection.body_text());
        }
    };

    let Some(question) = payload.question() else {
        return question_required();
    };

    if let Err(e) = payload.validate() {
        return bad_request(e.to_string());
    }

    let request = TranslationRequest {
        question: question.to_string(),
        requester_id: payload.account_number,
    };
    debug!(requester = ?request.requester_id, "Received NL2SQL question");

    match state.nl2sql.answer(&request).await {
        Ok(answer) => {
            info!(rows = answer.result.row_count(), "NL2SQL question answered");
            Json(Nl2SqlResponse::from(answer)).into_response()
        }
        Err(Nl2SqlError::EmptyQuestion) => question_required(),
        Err(err) => (err.status_code(), Json(Nl2SqlResponse::from(&err))).into_response(),
    }
}

fn question_required() -> Response {
    bad_request(Nl2SqlError::EmptyQuestion.to_string())
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// Recent questions logged for an account
pub async fn query_history(
    State(state): State<SharedState>,
    path: Result<Path<i32>, PathRejection>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<SuccessResponse<QueryHistoryResponse>>> {
    let Path(account_number) = path?;
    let Query(query) = query?;
    if account_number < 1 {
        return Err(validation_error("Account number must be positive"));
    }

    let entries = state
        .query_history
        .list_for_account(account_number, query.effective_limit())
        .await?;

    Ok(Json(SuccessResponse::new(QueryHistoryResponse {
        queries: entries.into_iter().map(QueryLogEntry::from).collect(),
    })))
}

#[cfg(test)]
mod tests {
    use crate::nl2sql::testing::{service, RecordingAudit, ScriptedCompletion, StaticExecutor};
    use crate::routes::tests::{call, call_raw, test_router};
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_nl2sql_success() {
        let audit = Arc::new(RecordingAudit::new());
        let app = test_router(service(
            Arc::new(ScriptedCompletion::replying("SELECT Problem_ID FROM PROBLEM LIMIT 5")),
            Arc::new(StaticExecutor::problem_ids(5)),
            audit.clone(),
        ));

        let (status, body) = call(
            app,
            "POST",
            "/chat/nl2sql",
            Some(json!({ "question": "first five problems", "account_number": 12 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sql"], "SELECT Problem_ID FROM PROBLEM LIMIT 5");
        assert_eq!(body["row_count"], 5);
        assert_eq!(body["error"], serde_json::Value::Null);
        assert_eq!(body["columns"], json!(["Problem_ID"]));
        assert_eq!(body["results"][4], json!({ "Problem_ID": 5 }));

        audit.wait_for_attempt().await;
        assert_eq!(audit.entries()[0].0, 12);
    }

    #[tokio::test]
    async fn test_nl2sql_missing_question() {
        let completion = Arc::new(ScriptedCompletion::replying("SELECT 1"));
        let app = test_router(service(
            completion.clone(),
            Arc::new(StaticExecutor::problem_ids(1)),
            Arc::new(RecordingAudit::new()),
        ));

        let (status, body) = call(app, "POST", "/chat/nl2sql", Some(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "question required" }));
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_nl2sql_unsafe_statement() {
        let executor = Arc::new(StaticExecutor::problem_ids(1));
        let app = test_router(service(
            Arc::new(ScriptedCompletion::replying("DELETE FROM PROBLEM")),
            executor.clone(),
            Arc::new(RecordingAudit::new()),
        ));

        let (status, body) = call(
            app,
            "POST",
            "/chat/nl2sql",
            Some(json!({ "question": "delete all problems" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["sql"], "DELETE FROM PROBLEM");
        assert_eq!(body["results"], json!([]));
        assert_eq!(
            body["error"],
            "Generated query is not safe. Only SELECT statements are allowed."
        );
        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn test_nl2sql_execution_failure() {
        let app = test_router(service(
            Arc::new(ScriptedCompletion::replying("SELECT * FROM PROBLEMS")),
            Arc::new(StaticExecutor::failing("relation \"problems\" does not exist")),
            Arc::new(RecordingAudit::new()),
        ));

        let (status, body) = call(
            app,
            "POST",
            "/chat/nl2sql",
            Some(json!({ "question": "all problems" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["sql"], "SELECT * FROM PROBLEMS");
        assert_eq!(
            body["error"],
            "Database error: relation \"problems\" does not exist"
        );
    }

    #[tokio::test]
    async fn test_nl2sql_generation_failure() {
        let app = test_router(service(
            Arc::new(ScriptedCompletion::failing("Rate limit reached")),
            Arc::new(StaticExecutor::problem_ids(1)),
            Arc::new(RecordingAudit::new()),
        ));

        let (status, body) = call(
            app,
            "POST",
            "/chat/nl2sql",
            Some(json!({ "question": "all problems" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "sql": "", "results": [], "error": "OpenAI API error: Rate limit reached" })
        );
    }

    #[tokio::test]
    async fn test_nl2sql_audit_failure_keeps_success() {
        let audit = Arc::new(RecordingAudit::failing());
        let app = test_router(service(
            Arc::new(ScriptedCompletion::replying("SELECT Problem_ID FROM PROBLEM")),
            Arc::new(StaticExecutor::problem_ids(3)),
            audit.clone(),
        ));

        let (status, body) = call(
            app,
            "POST",
            "/chat/nl2sql",
            Some(json!({ "question": "problems" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["row_count"], 3);
        assert_eq!(body["error"], serde_json::Value::Null);

        audit.wait_for_attempt().await;
        assert_eq!(audit.attempts(), 1);
    }

    #[tokio::test]
    async fn test_nl2sql_rejects_invalid_account_number() {
        let app = test_router(service(
            Arc::new(ScriptedCompletion::replying("SELECT 1")),
            Arc::new(StaticExecutor::problem_ids(1)),
            Arc::new(RecordingAudit::new()),
        ));

        let (status, body) = call(
            app,
            "POST",
            "/chat/nl2sql",
            Some(json!({ "question": "hi", "account_number": -3 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Account number"));
    }

    fn idle_app() -> axum::Router {
        test_router(service(
            Arc::new(ScriptedCompletion::replying("SELECT 1")),
            Arc::new(StaticExecutor::problem_ids(1)),
            Arc::new(RecordingAudit::new()),
        ))
    }

    #[tokio::test]
    async fn test_nl2sql_wrong_field_type_is_json_400() {
        let (status, body) = call(
            idle_app(),
            "POST",
            "/chat/nl2sql",
            Some(json!({ "question": 5 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("question"));

        let (status, body) = call(
            idle_app(),
            "POST",
            "/chat/nl2sql",
            Some(json!({ "question": "hi", "account_number": "12" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_nl2sql_missing_content_type_is_json_400() {
        let (status, body) = call_raw(
            idle_app(),
            "POST",
            "/chat/nl2sql",
            None,
            r#"{"question": "hi"}"#.to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Content-Type"));
    }

    #[tokio::test]
    async fn test_nl2sql_malformed_json_is_json_400() {
        let (status, body) = call_raw(
            idle_app(),
            "POST",
            "/chat/nl2sql",
            Some("application/json"),
            "{\"question\": ".to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_history_rejects_bad_limit() {
        let (status, body) = call(idle_app(), "GET", "/chat/history/3?limit=many", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_history_rejects_non_positive_account() {
        let app = test_router(service(
            Arc::new(ScriptedCompletion::replying("SELECT 1")),
            Arc::new(StaticExecutor::problem_ids(1)),
            Arc::new(RecordingAudit::new()),
        ));

        let (status, body) = call(app, "GET", "/chat/history/0", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}
