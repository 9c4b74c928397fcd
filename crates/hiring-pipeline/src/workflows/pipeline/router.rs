use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, ActorId, CandidateId, CandidateStatus, EventDecision, EventId, EventPatch,
    EventPayload, Role,
};
use super::repository::{ConsentDocument, DocumentStore, FeedbackNotifier, PipelineRepository};
use super::service::{PipelineError, PipelineOrchestrator, PipelineView};
use crate::error::pipeline_status;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const FILE_NAME_HEADER: &str = "x-file-name";

#[derive(Debug, Deserialize)]
pub(crate) struct ResolutionRequest {
    pub(crate) decision: EventDecision,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemarkRequest {
    pub(crate) title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    pub(crate) status: CandidateStatus,
}

/// Router builder exposing the candidate pipeline over HTTP.
pub fn pipeline_router<R, D, N>(service: Arc<PipelineOrchestrator<R, D, N>>) -> Router
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/candidates/:candidate_id",
            get(view_handler::<R, D, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/events",
            post(create_event_handler::<R, D, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/rejection",
            post(reject_candidate_handler::<R, D, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/onboarding",
            post(onboarding_handler::<R, D, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/remarks",
            post(remark_handler::<R, D, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/consent-form",
            post(consent_handler::<R, D, N>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/status",
            post(candidate_status_handler::<R, D, N>),
        )
        .route(
            "/api/v1/events/:event_id",
            patch(edit_event_handler::<R, D, N>).delete(delete_event_handler::<R, D, N>),
        )
        .route(
            "/api/v1/events/:event_id/resolution",
            post(resolve_event_handler::<R, D, N>),
        )
        .route(
            "/api/v1/events/:event_id/feedback",
            post(feedback_handler::<R, D, N>),
        )
        .with_state(service)
}

type SharedService<R, D, N> = State<Arc<PipelineOrchestrator<R, D, N>>>;

pub(crate) async fn view_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(candidate_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.view(&CandidateId(candidate_id), &actor),
    )
}

pub(crate) async fn create_event_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(candidate_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<EventPayload>, JsonRejection>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let payload = match json_body(payload) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(
        StatusCode::CREATED,
        service.create_event(&CandidateId(candidate_id), payload, &actor),
    )
}

pub(crate) async fn edit_event_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
    patch: Result<Json<EventPatch>, JsonRejection>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let patch = match json_body(patch) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.edit_event(&EventId(event_id), patch, &actor),
    )
}

pub(crate) async fn delete_event_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.delete_event(&EventId(event_id), &actor),
    )
}

pub(crate) async fn resolve_event_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
    request: Result<Json<ResolutionRequest>, JsonRejection>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let request = match json_body(request) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.resolve_event(&EventId(event_id), request.decision, &actor),
    )
}

pub(crate) async fn feedback_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.record_feedback_submitted(&EventId(event_id), &actor),
    )
}

pub(crate) async fn reject_candidate_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(candidate_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.reject_candidate(&CandidateId(candidate_id), &actor),
    )
}

pub(crate) async fn onboarding_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(candidate_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.initiate_onboarding(&CandidateId(candidate_id), &actor),
    )
}

pub(crate) async fn remark_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(candidate_id): Path<String>,
    headers: HeaderMap,
    request: Result<Json<RemarkRequest>, JsonRejection>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let request = match json_body(request) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(
        StatusCode::CREATED,
        service.append_remark(&CandidateId(candidate_id), &request.title, &actor),
    )
}

pub(crate) async fn candidate_status_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(candidate_id): Path<String>,
    headers: HeaderMap,
    request: Result<Json<StatusRequest>, JsonRejection>,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let request = match json_body(request) {
        Ok(value) => value,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.observe_candidate_status(&CandidateId(candidate_id), request.status, &actor),
    )
}

pub(crate) async fn consent_handler<R, D, N>(
    State(service): SharedService<R, D, N>,
    Path(candidate_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    R: PipelineRepository + 'static,
    D: DocumentStore + 'static,
    N: FeedbackNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let document = match consent_document(&headers, body) {
        Ok(document) => document,
        Err(error) => return error_response(error),
    };
    respond(
        StatusCode::CREATED,
        service.upload_consent_form(&CandidateId(candidate_id), document, &actor),
    )
}

fn consent_document(headers: &HeaderMap, body: Bytes) -> Result<ConsentDocument, PipelineError> {
    if body.is_empty() {
        return Err(PipelineError::InvalidInput(
            "consent document body is empty".to_string(),
        ));
    }
    let file_name = header_text(headers, FILE_NAME_HEADER).ok_or_else(|| {
        PipelineError::InvalidInput(format!("{FILE_NAME_HEADER} header is required"))
    })?;
    let content_type = header_text(headers, header::CONTENT_TYPE.as_str())
        .and_then(|raw| raw.parse::<mime::Mime>().ok())
        .unwrap_or(mime::APPLICATION_OCTET_STREAM);

    Ok(ConsentDocument {
        file_name,
        content_type,
        bytes: body.to_vec(),
    })
}

/// Reads the acting identity and role supplied by the identity layer in front of the service.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let id = header_text(headers, ACTOR_ID_HEADER);
    let role = header_text(headers, ACTOR_ROLE_HEADER);
    match (id, role) {
        (Some(id), Some(role)) => match role.parse::<Role>() {
            Ok(role) => Ok(Actor {
                id: ActorId(id),
                role,
            }),
            Err(message) => Err(unauthorized(&message)),
        },
        _ => Err(unauthorized(&format!(
            "{ACTOR_ID_HEADER} and {ACTOR_ROLE_HEADER} headers are required"
        ))),
    }
}

/// Renders body extraction failures in the same `{"error": ...}` shape as pipeline errors.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            let body = json!({ "error": rejection.body_text() });
            Err((rejection.status(), Json(body)).into_response())
        }
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn unauthorized(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

fn respond(success: StatusCode, result: Result<PipelineView, PipelineError>) -> Response {
    match result {
        Ok(view) => (success, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: PipelineError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (pipeline_status(&error), Json(payload)).into_response()
}
