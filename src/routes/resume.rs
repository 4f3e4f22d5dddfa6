use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    dto::resume_dto::{CreateResumePayload, UpdateResumePayload},
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/resumes",
    request_body = CreateResumePayload,
    responses(
        (status = 201, description = "Resume stored"),
        (status = 404, description = "Candidate not found"),
        (status = 422, description = "Resume cannot be profiled")
    )
)]
#[axum::debug_handler]
pub async fn create_resume(
    State(state): State<AppState>,
    Json(payload): Json<CreateResumePayload>,
) -> Result<impl IntoResponse> {
    let resume = state.resume_service.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(resume)))
}

#[utoipa::path(
    get,
    path = "/api/resumes/{id}",
    params(
        ("id" = Uuid, Path, description = "Resume ID")
    ),
    responses(
        (status = 200, description = "Resume"),
        (status = 404, description = "Resume not found")
    )
)]
#[axum::debug_handler]
pub async fn get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let resume = state.resume_service.get(id).await?;
    Ok(Json(resume))
}

#[utoipa::path(
    put,
    path = "/api/resumes/{id}",
    params(
        ("id" = Uuid, Path, description = "Resume ID")
    ),
    request_body = UpdateResumePayload,
    responses(
        (status = 200, description = "Resume replaced"),
        (status = 404, description = "Resume not found"),
        (status = 422, description = "Resume cannot be profiled")
    )
)]
#[axum::debug_handler]
pub async fn update_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateResumePayload>,
) -> Result<impl IntoResponse> {
    let resume = state
        .resume_service
        .update(id, payload.file_name, payload.parsed)
        .await?;
    Ok(Json(resume))
}

#[utoipa::path(
    get,
    path = "/api/resumes/{id}/analysis",
    params(
        ("id" = Uuid, Path, description = "Resume ID")
    ),
    responses(
        (status = 200, description = "Skills, experience, education and ranked open jobs"),
        (status = 404, description = "Resume not found")
    )
)]
#[axum::debug_handler]
pub async fn analyze_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let analysis = state.match_service.analyze_resume(id).await?;
    Ok(Json(analysis))
}
