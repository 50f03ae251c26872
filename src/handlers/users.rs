use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::{self, password};
use crate::error::ApiError;
use crate::middleware::{CurrentUser, X_AUTH_HEADER};
use crate::store::User;
use crate::AppState;

/// Allow-listed registration/login body. Unknown fields submitted by the
/// client are dropped during deserialization and never reach the store.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// POST /users - Register a new account
///
/// Responds with the public user; the fresh session token travels in the
/// x-auth response header, never in the body.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Response, ApiError> {
    let email = body.email.trim().to_lowercase();
    validate_email(&email)?;

    if body.password.chars().count() < 6 {
        return Err(ApiError::validation_error(
            "password must be at least 6 characters",
        ));
    }

    let hash = password::hash_password(&body.password).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::internal_server_error("could not create account")
    })?;

    let user = state.users.insert(User::new(email, hash)).await?;

    let token = issue_and_store_token(&state, &user).await?;
    token_response(user, &token)
}

/// Well-formed Argon2id hash of no password at all. Login verifies against
/// it when the email is unknown, so both failure paths run the hash and
/// cost a comparable amount of work.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dG9kb2FwaWR1bW15c2FsdA$AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8";

/// POST /users/login
///
/// Unknown email and wrong password produce the identical response, so a
/// caller cannot probe which addresses have accounts.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Response, ApiError> {
    let email = body.email.trim().to_lowercase();

    let user = match state.users.find_by_email(&email).await? {
        Some(user) if password::verify_password(&body.password, &user.password_hash) => user,
        Some(_) => return Err(invalid_credentials()),
        None => {
            password::verify_password(&body.password, DUMMY_PASSWORD_HASH);
            return Err(invalid_credentials());
        }
    };

    let token = issue_and_store_token(&state, &user).await?;
    token_response(user, &token)
}

/// GET /users/me - Current authenticated user
pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}

/// DELETE /users/me/token - Log out the presenting session
///
/// Removes only the token that authenticated this request; sessions on
/// other devices keep their tokens.
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    state
        .users
        .remove_token(current.user.id, &current.token)
        .await?;

    Ok(StatusCode::OK)
}

async fn issue_and_store_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    let token = auth::issue_token(user.id).map_err(|e| {
        tracing::error!("token issuance failed: {}", e);
        ApiError::internal_server_error("could not create session")
    })?;

    // Multiple concurrent tokens per user are allowed (multi-device)
    state.users.push_token(user.id, &token).await?;

    Ok(token)
}

fn token_response(user: User, token: &str) -> Result<Response, ApiError> {
    let header = HeaderValue::from_str(token).map_err(|_| {
        tracing::error!("issued token is not a valid header value");
        ApiError::internal_server_error("could not create session")
    })?;

    let mut response = Json(user).into_response();
    response.headers_mut().insert(X_AUTH_HEADER, header);
    Ok(response)
}

fn invalid_credentials() -> ApiError {
    ApiError::bad_request("invalid credentials")
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ApiError::validation_error(format!(
            "{} is not a valid email",
            email
        )))
    }
}
