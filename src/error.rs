use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Error kinds surfaced by the API. Each maps to a status code and a JSON
/// body of the form `{"error": message}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Conflict(String),
    /// Bad email/password pair at login. Distinct from `Unauthorized`:
    /// credential failures surface as 400, token failures as 401.
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("image store error: {0}")]
    Upstream(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidCredentials(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Db(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::Upstream(e) => {
                tracing::error!(error = %e, "image store error");
                (StatusCode::BAD_GATEWAY, "image store unavailable".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kinds() {
        let cases = [
            (AppError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (
                AppError::InvalidCredentials("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::Db(sqlx::Error::PoolClosed);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
