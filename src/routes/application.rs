use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    dto::{
        application_dto::{ApplicationListQuery, CreateApplicationPayload, UpdateStatusPayload},
        ListResponse,
    },
    error::Result,
    models::application::Application,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = CreateApplicationPayload,
    responses(
        (status = 201, description = "Application created"),
        (status = 200, description = "An open application already existed and is returned"),
        (status = 400, description = "Resume/candidate mismatch or closed job"),
        (status = 404, description = "Resume or job not found")
    )
)]
#[axum::debug_handler]
pub async fn create_application(
    State(state): State<AppState>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse> {
    let (application, created) = state
        .match_service
        .apply(payload.candidate_id, payload.job_id, payload.resume_id)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(application)))
}

#[utoipa::path(
    get,
    path = "/api/applications",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("candidate_id" = Option<Uuid>, Query, description = "Filter by candidate"),
        ("job_id" = Option<Uuid>, Query, description = "Filter by job"),
        ("sort" = Option<String>, Query, description = "`created_at` (default) or `match_score`")
    ),
    responses(
        (status = 200, description = "List of applications"),
        (status = 400, description = "Unknown status or sort")
    )
)]
#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.filter()?;
    let page = state
        .application_service
        .list(&filter, query.page_request())
        .await?;
    Ok(Json(ListResponse::<Application>::from(page)))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application", body = Json<Application>),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state.application_service.get(id).await?;
    Ok(Json(application))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status changed", body = Json<Application>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Illegal transition or version conflict")
    )
)]
#[axum::debug_handler]
pub async fn update_application_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    let target = payload.target()?;
    let application = state
        .application_service
        .set_status(id, target, payload.expected_version)
        .await?;
    Ok(Json(application))
}

#[utoipa::path(
    delete,
    path = "/api/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 204, description = "Application deleted"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.application_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
