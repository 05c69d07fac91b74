//! API Middleware
//!
//! Bearer access-token authentication for the account routes.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::routes::AppState;

/// Authenticated caller, extracted from a verified access token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub name: String,
}

/// Validate the `Authorization: Bearer` access token and stash the
/// caller's identity in the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(unauthorized("Missing bearer token", "missing_token"));
    };

    match state.signer.verify(token) {
        Ok(claims) => {
            request
                .extensions_mut()
                .insert(CurrentUser { name: claims.sub });
            Ok(next.run(request).await)
        }
        Err(_) => Err(unauthorized(
            "Invalid or expired access token",
            "invalid_token",
        )),
    }
}

fn unauthorized(message: &str, error_code: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": message,
            "error_code": error_code,
        })),
    )
        .into_response()
}
