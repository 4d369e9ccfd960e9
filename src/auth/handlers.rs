use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, CheckUserRequest, CheckUserResponse, LoginRequest, RegisterRequest},
        password::{hash_password_blocking, verify_password_blocking},
        repo::RepoError,
        services::{validate_login, validate_registration},
    },
    error::{AppError, AppResult},
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password.";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/check-user", post(check_user))
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Reports whether a username is taken. Unauthenticated, so usernames can be probed.
#[instrument(skip(state, payload))]
pub async fn check_user(
    State(state): State<AppState>,
    payload: Result<Json<CheckUserRequest>, JsonRejection>,
) -> AppResult<Json<CheckUserResponse>> {
    let Json(payload) = payload?;
    let exists = state
        .users
        .username_exists(payload.username.trim())
        .await
        .map_err(|e| {
            error!(error = %e, "check user failed");
            AppError::internal("Server error during user check.", e)
        })?;
    Ok(Json(CheckUserResponse { exists }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    const FAILED: &str = "Registration failed due to a server error.";

    let Json(payload) = payload?;
    let valid = validate_registration(payload).map_err(|e| {
        warn!(reason = %e, "registration rejected");
        e
    })?;

    let hash = hash_password_blocking(valid.password.clone())
        .await
        .map_err(|e| {
            error!(error = %e, "hash_password failed");
            AppError::internal(FAILED, e)
        })?;

    let user = match state.users.create(valid.into_new_user(hash)).await {
        Ok(u) => u,
        Err(RepoError::Conflict) => {
            warn!("username or email already registered");
            return Err(AppError::Conflict("Username or email already exists.".into()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(AppError::internal(FAILED, e));
        }
    };

    let token = state.jwt.issue(user.id, &user.username).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        AppError::internal(FAILED, e)
    })?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully!",
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    const FAILED: &str = "Server error during login.";

    let Json(payload) = payload?;
    validate_login(&payload)?;
    let username = payload.username.trim();

    let user = state.users.find_by_username(username).await.map_err(|e| {
        error!(error = %e, "find_by_username failed");
        AppError::internal(FAILED, e)
    })?;

    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let matches = verify_password_blocking(payload.password, stored_hash)
        .await
        .map_err(|e| {
            error!(error = %e, "verify_password failed");
            AppError::internal(FAILED, e)
        })?;

    let user = match user {
        Some(u) if matches => u,
        _ => {
            warn!(username = %username, "login rejected");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let token = state.jwt.issue(user.id, &user.username).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        AppError::internal(FAILED, e)
    })?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful!",
        token,
    }))
}
