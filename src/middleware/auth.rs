use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth;
use crate::error::ApiError;
use crate::store::User;
use crate::AppState;

/// Header carrying the session token on requests and token-issuing responses.
pub const X_AUTH_HEADER: &str = "x-auth";

/// Authenticated request context, valid for the duration of one request.
///
/// Carries the raw token alongside the resolved user so that logout can
/// remove exactly the token that authenticated the call.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Session authentication middleware guarding every ownership-scoped route.
///
/// Resolution order: x-auth header present, token verifies, user exists,
/// raw token still in the user's active-token list. Any miss rejects with
/// a uniform 401 before the handler runs; the list check is what makes
/// logout invalidate a token whose signature still verifies.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(X_AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(unauthorized)?;

    let user_id = auth::verify_token(&token).map_err(|e| {
        tracing::debug!("token rejected: {}", e);
        unauthorized()
    })?;

    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(|e| {
            tracing::error!("user lookup failed during auth: {}", e);
            unauthorized()
        })?
        .ok_or_else(unauthorized)?;

    if !user.tokens.iter().any(|t| t == &token) {
        // Valid signature but revoked (or never stored) token
        return Err(unauthorized());
    }

    request.extensions_mut().insert(CurrentUser { user, token });

    Ok(next.run(request).await)
}

fn unauthorized() -> ApiError {
    ApiError::unauthorized("authentication required")
}
