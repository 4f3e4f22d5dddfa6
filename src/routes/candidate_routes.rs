use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        candidate_dto::{CandidateResponse, CreateCandidatePayload},
        ListResponse, PageQuery,
    },
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/candidates",
    request_body = CreateCandidatePayload,
    responses(
        (status = 201, description = "Candidate created", body = Json<CandidateResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    Json(payload): Json<CreateCandidatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate = state.candidate_service.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(CandidateResponse::from(candidate))))
}

#[utoipa::path(
    get,
    path = "/api/candidates",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of candidates")
    )
)]
#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let page = state.candidate_service.list(query.request()).await?;
    Ok(Json(ListResponse::<CandidateResponse>::from(page)))
}

#[utoipa::path(
    get,
    path = "/api/candidates/{id}",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Candidate", body = Json<CandidateResponse>),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get(id).await?;
    Ok(Json(CandidateResponse::from(candidate)))
}

#[utoipa::path(
    get,
    path = "/api/candidates/{id}/resumes",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Resumes of the candidate, newest first"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn list_candidate_resumes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let resumes = state.resume_service.list_for_candidate(id).await?;
    Ok(Json(resumes))
}
