pub mod application;
pub mod candidate_routes;
pub mod health;
pub mod job;
pub mod resume;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::{require_admin, require_bearer_auth},
    cors::api_cors,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/candidates",
            get(candidate_routes::list_candidates).post(candidate_routes::create_candidate),
        )
        .route("/api/candidates/:id", get(candidate_routes::get_candidate))
        .route(
            "/api/candidates/:id/resumes",
            get(candidate_routes::list_candidate_resumes),
        )
        .route("/api/resumes", axum::routing::post(resume::create_resume))
        .route(
            "/api/resumes/:id",
            get(resume::get_resume).put(resume::update_resume),
        )
        .route("/api/resumes/:id/analysis", get(resume::analyze_resume))
        .route("/api/jobs", get(job::list_jobs).post(job::create_job))
        .route("/api/jobs/:id", get(job::get_job).put(job::update_job))
        .route("/api/jobs/:id/candidates", get(job::ranked_candidates))
        .route(
            "/api/applications",
            get(application::list_applications).post(application::create_application),
        )
        .route(
            "/api/applications/:id",
            get(application::get_application).merge(
                delete(application::delete_application).route_layer(from_fn(require_admin)),
            ),
        )
        .route(
            "/api/applications/:id/status",
            axum::routing::patch(application::update_application_status),
        )
        .layer(from_fn_with_state(
            RateLimiter::new(state.config.api_rps),
            rps_middleware,
        ))
        .layer(from_fn_with_state(state.clone(), require_bearer_auth));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
