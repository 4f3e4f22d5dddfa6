use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppState;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .map_or(false, |r| r.eq_ignore_ascii_case(role))
    }
}

fn unauthorized(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": reason, "kind": "unauthorized" })),
    )
        .into_response()
}

fn claims_from_request(req: &Request, secret: &str) -> Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| {
        tracing::warn!(error = %err, "rejected bearer token");
        unauthorized("invalid_token")
    })
}

pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match claims_from_request(&req, &state.config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(response) => response,
    }
}

/// Runs after `require_bearer_auth`; rejects principals without the admin role.
pub async fn require_admin(req: Request, next: Next) -> Response {
    match req.extensions().get::<Claims>() {
        Some(claims) if claims.has_role(ADMIN_ROLE) => next.run(req).await,
        Some(claims) => {
            tracing::warn!(sub = %claims.sub, "admin route refused");
            (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "forbidden", "kind": "forbidden" })),
            )
                .into_response()
        }
        None => unauthorized("missing_authorization"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_check_ignores_case() {
        let claims = Claims {
            sub: "u1".into(),
            exp: 0,
            role: Some("Admin".into()),
        };
        assert!(claims.has_role(ADMIN_ROLE));

        let claims = Claims {
            role: None,
            ..claims
        };
        assert!(!claims.has_role(ADMIN_ROLE));
    }
}
