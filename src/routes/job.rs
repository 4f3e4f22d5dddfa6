use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{job_dto::{JobListQuery, JobPayload}, ListResponse, PageQuery},
    error::Result,
    models::job::Job,
    services::match_service::{CandidateMatch, JobMatch},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = JobPayload,
    responses(
        (status = 201, description = "Job created"),
        (status = 400, description = "Invalid payload"),
        (status = 422, description = "Posting cannot be turned into a requirement")
    )
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Json(payload): Json<JobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (posting, is_active) = payload.into_parts();
    let job = state.job_service.create(posting, is_active).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("search" = Option<String>, Query, description = "Title search"),
        ("active_only" = Option<bool>, Query, description = "Only open jobs"),
        ("resume_id" = Option<Uuid>, Query, description = "Rank jobs against this resume")
    ),
    responses(
        (status = 200, description = "Jobs, newest first, or best match first when resume_id is given")
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<Response> {
    let filter = query.filter();
    let page = query.page_request();

    let response = match query.resume_id {
        Some(resume_id) => {
            let ranked = state
                .match_service
                .ranked_jobs(resume_id, &filter, page)
                .await?;
            Json(ListResponse::<JobMatch>::from(ranked)).into_response()
        }
        None => {
            let jobs = state.job_service.list(&filter, page).await?;
            Json(ListResponse::<Job>::from(jobs)).into_response()
        }
    };
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get(id).await?;
    Ok(Json(job))
}

#[utoipa::path(
    put,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    request_body = JobPayload,
    responses(
        (status = 200, description = "Job replaced"),
        (status = 404, description = "Job not found"),
        (status = 422, description = "Posting cannot be turned into a requirement")
    )
)]
#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (posting, is_active) = payload.into_parts();
    let job = state.job_service.update(id, posting, is_active).await?;
    Ok(Json(job))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}/candidates",
    params(
        ("id" = Uuid, Path, description = "Job ID"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Candidates ranked by match score"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn ranked_candidates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let ranked = state
        .match_service
        .ranked_candidates(id, query.request())
        .await?;
    Ok(Json(ListResponse::<CandidateMatch>::from(ranked)))
}
