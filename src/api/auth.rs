use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{error::ApiError, state::AppState, utils::token_matches};

/// Header carrying the pre-shared secret
pub const MESH_TOKEN_HEADER: &str = "X-Mesh-Token";

/// Reject any request whose `X-Mesh-Token` does not equal the shared secret
///
/// Runs before the handler, so a rejected call never reaches the store.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(MESH_TOKEN_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    if !token_matches(presented, state.shared_secret.as_bytes()) {
        state.metrics.auth_rejected();
        warn!(
            method = %request.method(),
            path = request.uri().path(),
            token_present = !presented.is_empty(),
            "Rejected unauthenticated request"
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
