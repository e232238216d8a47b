use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Applicant, ApplicantId, ApplicantSubmission};
use super::repository::Store;
use super::service::{ApplicantQuery, ApplicantService, SubmissionError};
use super::ErrorCode;

/// Body of `PUT /api/v1/applicants/:applicant_id`: the submission plus the
/// version the caller last read.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    #[serde(flatten)]
    pub submission: ApplicantSubmission,
    pub version: u64,
}

/// Router builder exposing the applicant CRUD endpoints.
pub fn applicant_router<S>(service: Arc<ApplicantService<S>>) -> Router
where
    S: Store<Applicant>,
{
    Router::new()
        .route(
            "/api/v1/applicants",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route(
            "/api/v1/applicants/:applicant_id",
            get(fetch_handler::<S>)
                .put(update_handler::<S>)
                .delete(delete_handler::<S>),
        )
        .with_state(service)
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::StoreUnavailable | ErrorCode::ResolverUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub(crate) fn error_response(error: SubmissionError) -> Response {
    let code = error.code();
    let payload = match error {
        SubmissionError::Rejected(violations) => json!({
            "code": code,
            "violations": violations,
        }),
        other => json!({
            "error": other.to_string(),
            "code": code,
        }),
    };
    (status_for(code), Json(payload)).into_response()
}

/// Bodies and query strings that do not deserialize are reported with the
/// extractor's status, in the same payload shape as every other error.
fn malformed_request(status: StatusCode, message: String) -> Response {
    let payload = json!({
        "error": message,
        "code": ErrorCode::ValidationFailure,
    });
    (status, Json(payload)).into_response()
}

fn json_rejection(rejection: JsonRejection) -> Response {
    malformed_request(rejection.status(), rejection.body_text())
}

fn query_rejection(rejection: QueryRejection) -> Response {
    malformed_request(rejection.status(), rejection.body_text())
}

fn unknown_applicant(raw: &str) -> Response {
    let payload = json!({
        "error": format!("applicant {raw} not found"),
        "code": ErrorCode::NotFound,
    });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<ApplicantService<S>>>,
    payload: Result<Json<ApplicantSubmission>, JsonRejection>,
) -> Response
where
    S: Store<Applicant>,
{
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection(rejection),
    };
    match service.submit(submission).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fetch_handler<S>(
    State(service): State<Arc<ApplicantService<S>>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    S: Store<Applicant>,
{
    let Ok(id) = applicant_id.parse::<ApplicantId>() else {
        return unknown_applicant(&applicant_id);
    };
    match service.get(&id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<ApplicantService<S>>>,
    Path(applicant_id): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Response
where
    S: Store<Applicant>,
{
    let Ok(id) = applicant_id.parse::<ApplicantId>() else {
        return unknown_applicant(&applicant_id);
    };
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection(rejection),
    };
    match service
        .update(&id, request.submission, request.version)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<S>(
    State(service): State<Arc<ApplicantService<S>>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    S: Store<Applicant>,
{
    let Ok(id) = applicant_id.parse::<ApplicantId>() else {
        return unknown_applicant(&applicant_id);
    };
    match service.delete(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<ApplicantService<S>>>,
    query: Result<Query<ApplicantQuery>, QueryRejection>,
) -> Response
where
    S: Store<Applicant>,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection(rejection),
    };
    match service.search(&query).await {
        Ok(applicants) => (StatusCode::OK, Json(applicants)).into_response(),
        Err(error) => error_response(error),
    }
}
