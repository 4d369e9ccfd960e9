//! Application error type and the single JSON error body.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Request, State,
    },
    http::{header::CONTENT_LENGTH, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::state::AppState;

pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced at the route boundary. Each variant carries the client-facing
/// message; `detail` is only shown outside production.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{message}")]
    GatewayTimeout { message: String, detail: String },

    #[error("{message}: {detail}")]
    Upstream { message: String, detail: String },

    #[error("{message}: {detail}")]
    Internal { message: String, detail: String },
}

impl AppError {
    pub fn internal(message: impl Into<String>, detail: impl ToString) -> Self {
        Self::Internal {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn parts(&self) -> (&str, Option<&str>) {
        match self {
            Self::Validation(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::Conflict(m)
            | Self::NotFound(m)
            | Self::RateLimited(m) => (m, None),
            Self::GatewayTimeout { message, detail }
            | Self::Upstream { message, detail }
            | Self::Internal { message, detail } => (message, Some(detail)),
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, detail) = self.parts();
        let mut res = (
            status,
            Json(ErrorBody {
                message: message.to_string(),
                error: None,
            }),
        )
            .into_response();
        if let Some(detail) = detail {
            res.extensions_mut().insert(ErrorBody {
                message: message.to_string(),
                error: Some(detail.to_string()),
            });
        }
        res
    }
}

/// Re-renders error responses with their `error` detail when not in production.
pub async fn expose_error_details(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let detailed = res.extensions_mut().remove::<ErrorBody>();
    match detailed {
        Some(body) if !state.config.environment.is_production() => with_body(res, body),
        _ => res,
    }
}

/// Swaps in `body`, keeping the status and every header except the length.
fn with_body(res: Response, body: ErrorBody) -> Response {
    let (mut parts, _) = res.into_parts();
    let mut fresh = Json(body).into_response();
    parts.headers.remove(CONTENT_LENGTH);
    for (name, value) in fresh.headers_mut().drain() {
        if let Some(name) = name {
            parts.headers.insert(name, value);
        }
    }
    Response::from_parts(parts, fresh.into_body())
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}
