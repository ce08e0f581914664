use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::errors::AppError;
use crate::models::Unit;
use crate::AppState;

// ── Handlers ─────────────────────────────────────────────────

/// GET /init/:unit — create the unit's table if it is missing
pub async fn init_unit(
    State(state): State<Arc<AppState>>,
    Path(unit): Path<String>,
) -> Result<String, AppError> {
    let unit = Unit::parse(&unit)?;
    state.tokens.init_unit(&unit).await?;

    Ok(format!("Initialized or already exists for unit: {}", unit))
}

/// GET /generate/:unit — issue a token, write its QR image, return the URL
pub async fn generate_token(
    State(state): State<Arc<AppState>>,
    Path(unit): Path<String>,
) -> Result<String, AppError> {
    let unit = Unit::parse(&unit)?;
    let issued = state.tokens.issue(&unit).await?;

    Ok(format!("Generated URL for unit {}: {}", unit, issued.url))
}

/// GET /:unit/:token — report a stored token.
///
/// Static files such as `/:unit/<token>.png` share this route shape.
/// Tokens never contain a `.`, so any such segment is handed to the
/// static file service instead.
pub async fn resolve_token(
    State(state): State<Arc<AppState>>,
    Path((unit, token)): Path<(String, String)>,
    req: Request,
) -> Result<Response, AppError> {
    if token.contains('.') {
        return Ok(serve_static(&state, req).await);
    }

    let unit = Unit::parse(&unit)?;
    let record = state.tokens.resolve(&unit, &token).await?;

    Ok(format!(
        "Accessed URL for unit {}: {}",
        unit,
        record.token.trim_end()
    )
    .into_response())
}

async fn serve_static(state: &AppState, req: Request) -> Response {
    match ServeDir::new(state.tokens.image_dir()).oneshot(req).await {
        Ok(resp) => resp.into_response(),
        Err(never) => match never {},
    }
}

/// GET /readyz — database round-trip
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Response {
    match state.tokens.db().ping().await {
        Ok(()) => Json(json!({ "status": "ready" })).into_response(),
        Err(e) => {
            tracing::warn!("readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}
