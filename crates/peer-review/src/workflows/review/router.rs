use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    AssignmentId, ManuscriptId, Recommendation, ReviewStatus, ReviewerId, ValidationError,
};
use super::eligibility::Ineligibility;
use super::lifecycle::{DraftUpdate, TransitionError};
use super::policy::{AssignmentStrategy, UnknownStrategy};
use super::repository::{
    AssignmentFilter, ManuscriptRepository, ReviewAssignmentRepository, ReviewerProfileRepository,
};
use super::selection::AssignmentError;
use super::service::{OpenReview, ReviewServiceError, ReviewWorkflowService, SubmitReview};

type SharedService<M, P, A> = Arc<ReviewWorkflowService<M, P, A>>;

/// Router builder exposing the review workflow over HTTP.
pub fn review_router<M, P, A>(service: SharedService<M, P, A>) -> Router
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/manuscripts/:manuscript_id/reviews",
            get(manuscript_reviews_handler::<M, P, A>).post(open_review_handler::<M, P, A>),
        )
        .route(
            "/api/v1/manuscripts/:manuscript_id/panel",
            post(assign_panel_handler::<M, P, A>),
        )
        .route(
            "/api/v1/manuscripts/:manuscript_id/auto-assign",
            post(auto_assign_handler::<M, P, A>),
        )
        .route(
            "/api/v1/manuscripts/:manuscript_id/candidates",
            get(candidates_handler::<M, P, A>),
        )
        .route(
            "/api/v1/manuscripts/:manuscript_id/consensus",
            get(consensus_handler::<M, P, A>),
        )
        .route(
            "/api/v1/manuscripts/:manuscript_id/eligibility/:reviewer",
            get(eligibility_handler::<M, P, A>),
        )
        .route(
            "/api/v1/manuscripts/:manuscript_id/publish",
            post(publish_handler::<M, P, A>),
        )
        .route(
            "/api/v1/manuscripts/:manuscript_id/reject",
            post(reject_handler::<M, P, A>),
        )
        .route(
            "/api/v1/reviewers/:reviewer/qualification",
            get(qualification_handler::<M, P, A>),
        )
        .route("/api/v1/reviews", get(list_handler::<M, P, A>))
        .route("/api/v1/reviews/:assignment_id", get(assignment_handler::<M, P, A>))
        .route(
            "/api/v1/reviews/:assignment_id/assign",
            post(assign_handler::<M, P, A>),
        )
        .route(
            "/api/v1/reviews/:assignment_id/draft",
            put(draft_handler::<M, P, A>),
        )
        .route(
            "/api/v1/reviews/:assignment_id/submit",
            post(submit_handler::<M, P, A>),
        )
        .route(
            "/api/v1/reviews/:assignment_id/extend",
            post(extend_handler::<M, P, A>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StrategyQuery {
    #[serde(default)]
    strategy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AutoAssignRequest {
    #[serde(default)]
    strategy: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PanelRequest {
    reviewers: Vec<ReviewerId>,
    #[serde(default)]
    editor: Option<ReviewerId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    reviewer: ReviewerId,
    #[serde(default)]
    editor: Option<ReviewerId>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DraftRequest {
    #[serde(default)]
    comments: Option<String>,
    #[serde(default)]
    confidential_comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    reviewer: ReviewerId,
    recommendation: String,
    #[serde(default)]
    comments: Option<String>,
    #[serde(default)]
    confidential_comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtendRequest {
    days: i64,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    editor: ReviewerId,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    status: Option<ReviewStatus>,
    #[serde(default)]
    reviewer: Option<String>,
    #[serde(default)]
    editor: Option<String>,
    #[serde(default)]
    overdue: Option<bool>,
    #[serde(default)]
    limit: Option<usize>,
}

impl ListQuery {
    fn into_filter(self) -> AssignmentFilter {
        AssignmentFilter {
            status: self.status,
            reviewer: self.reviewer.map(ReviewerId),
            editor: self.editor.map(ReviewerId),
            overdue_at: self.overdue.unwrap_or(false).then(Utc::now),
            limit: self.limit,
        }
    }
}

fn parse_strategy(raw: Option<String>) -> Result<Option<AssignmentStrategy>, Response> {
    match raw {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|err: UnknownStrategy| {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }),
    }
}

pub(crate) async fn open_review_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(manuscript_id): Path<u64>,
    axum::Json(request): axum::Json<OpenReview>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.open_review(ManuscriptId(manuscript_id), request).await {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view(Utc::now()))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn manuscript_reviews_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(manuscript_id): Path<u64>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.reviews_for(ManuscriptId(manuscript_id)) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assign_panel_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(manuscript_id): Path<u64>,
    axum::Json(request): axum::Json<PanelRequest>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service
        .assign_panel(ManuscriptId(manuscript_id), request.reviewers, request.editor)
        .await
    {
        Ok(records) => (StatusCode::CREATED, axum::Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn auto_assign_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(manuscript_id): Path<u64>,
    request: Option<axum::Json<AutoAssignRequest>>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    let request = request.map(|axum::Json(body)| body).unwrap_or_default();
    let strategy = match parse_strategy(request.strategy) {
        Ok(strategy) => strategy,
        Err(response) => return response,
    };
    match service.auto_assign(ManuscriptId(manuscript_id), strategy).await {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn candidates_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(manuscript_id): Path<u64>,
    Query(query): Query<StrategyQuery>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    let strategy = match parse_strategy(query.strategy) {
        Ok(strategy) => strategy,
        Err(response) => return response,
    };
    match service
        .qualified_reviewers(ManuscriptId(manuscript_id), strategy)
        .await
    {
        Ok(ranking) => (StatusCode::OK, axum::Json(ranking)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn consensus_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(manuscript_id): Path<u64>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.consensus_status(ManuscriptId(manuscript_id)) {
        Ok(status) => (StatusCode::OK, axum::Json(status)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn eligibility_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path((manuscript_id, reviewer)): Path<(u64, String)>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.check_eligibility(&ReviewerId(reviewer), ManuscriptId(manuscript_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn publish_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(manuscript_id): Path<u64>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.publish(ManuscriptId(manuscript_id), request.editor).await {
        Ok(manuscript) => (StatusCode::OK, axum::Json(manuscript)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reject_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(manuscript_id): Path<u64>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.reject(ManuscriptId(manuscript_id), request.editor).await {
        Ok(manuscript) => (StatusCode::OK, axum::Json(manuscript)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn qualification_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(reviewer): Path<String>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.reviewer_qualification(&ReviewerId(reviewer)) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.list_assignments(&query.into_filter()) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assignment_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(assignment_id): Path<u64>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.assignment(AssignmentId(assignment_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assign_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(assignment_id): Path<u64>,
    axum::Json(request): axum::Json<AssignRequest>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service
        .assign_reviewer(AssignmentId(assignment_id), request.reviewer, request.editor)
        .await
    {
        Ok(record) => (StatusCode::OK, axum::Json(record.view(Utc::now()))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn draft_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(assignment_id): Path<u64>,
    axum::Json(request): axum::Json<DraftRequest>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    let update = DraftUpdate {
        comments: request.comments,
        confidential_comments: request.confidential_comments,
    };
    match service.save_draft(AssignmentId(assignment_id), update) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view(Utc::now()))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(assignment_id): Path<u64>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    let recommendation: Recommendation = match request.recommendation.parse() {
        Ok(recommendation) => recommendation,
        Err(err) => return error_response(ReviewServiceError::Validation(err)),
    };
    let submission = SubmitReview {
        reviewer: request.reviewer,
        recommendation,
        comments: request.comments,
        confidential_comments: request.confidential_comments,
    };
    match service.submit_review(AssignmentId(assignment_id), submission).await {
        Ok(submitted) => (StatusCode::OK, axum::Json(submitted)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn extend_handler<M, P, A>(
    State(service): State<SharedService<M, P, A>>,
    Path(assignment_id): Path<u64>,
    axum::Json(request): axum::Json<ExtendRequest>,
) -> Response
where
    M: ManuscriptRepository + 'static,
    P: ReviewerProfileRepository + 'static,
    A: ReviewAssignmentRepository + 'static,
{
    match service.extend_deadline(AssignmentId(assignment_id), request.days, request.reason) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view(Utc::now()))).into_response(),
        Err(err) => error_response(err),
    }
}

/// Maps a service failure onto a status code and a JSON body carrying the message and
/// any per-criterion details.
pub(crate) fn error_response(err: ReviewServiceError) -> Response {
    let status = status_for(&err);
    let mut payload = json!({
        "error": err.to_string(),
        "retryable": err.is_retryable(),
    });

    match &err {
        ReviewServiceError::Ineligible { reason, .. } => {
            payload["code"] = json!(reason.code());
            if let Ineligibility::Unqualified { qualification } = reason {
                payload["checks"] = json!(qualification.checks);
            }
        }
        ReviewServiceError::QuorumNotReached { status }
        | ReviewServiceError::ConsensusFavorsPublication { status } => {
            payload["consensus"] = json!(status);
        }
        ReviewServiceError::Assignment(assignment) if !assignment.candidates().is_empty() => {
            payload["candidates"] = json!(assignment.candidates());
        }
        _ => {}
    }

    (status, axum::Json(payload)).into_response()
}

fn status_for(err: &ReviewServiceError) -> StatusCode {
    match err {
        ReviewServiceError::ManuscriptNotFound(_)
        | ReviewServiceError::AssignmentNotFound(_)
        | ReviewServiceError::ReviewerNotFound(_) => StatusCode::NOT_FOUND,
        ReviewServiceError::Ineligible { .. } => StatusCode::FORBIDDEN,
        ReviewServiceError::Validation(ValidationError::Profile(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ReviewServiceError::Validation(_)
        | ReviewServiceError::Transition(TransitionError::DeadlineOutOfRange) => {
            StatusCode::BAD_REQUEST
        }
        ReviewServiceError::Transition(_)
        | ReviewServiceError::Conflict(_)
        | ReviewServiceError::AlreadyDecided { .. }
        | ReviewServiceError::QuorumNotReached { .. }
        | ReviewServiceError::ConsensusFavorsPublication { .. } => StatusCode::CONFLICT,
        ReviewServiceError::Overloaded { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ReviewServiceError::Assignment(err) => match err {
            AssignmentError::ManuscriptNotFound(_) => StatusCode::NOT_FOUND,
            AssignmentError::ManuscriptClosed { .. }
            | AssignmentError::AlreadyAssigned(_)
            | AssignmentError::Conflict(_) => StatusCode::CONFLICT,
            AssignmentError::NoQualifiedReviewers { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AssignmentError::AllOverloaded { .. } | AssignmentError::OracleUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AssignmentError::OracleNotConfigured => StatusCode::BAD_REQUEST,
            AssignmentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        ReviewServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
