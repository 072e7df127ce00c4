use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::gates::GateValidationError;
use crate::models::{
    ConfigValidationError, EnvironmentValidationError, FlagValidationError, ProjectValidationError,
};
use crate::values::UnknownValueType;

/// Lookup failures, one variant per entity so each maps to its own error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("Project '{0}' not found")]
    Project(String),

    #[error("Environment '{0}' not found")]
    Environment(String),

    #[error("Flag '{0}' not found")]
    Flag(String),

    #[error("No config for flag '{flag}' in environment '{environment}'")]
    FlagEnvironmentConfig { flag: String, environment: String },
}

impl NotFoundError {
    pub fn code(&self) -> &'static str {
        match self {
            NotFoundError::Project(_) => "PROJECT_NOT_FOUND",
            NotFoundError::Environment(_) => "ENVIRONMENT_NOT_FOUND",
            NotFoundError::Flag(_) => "FLAG_NOT_FOUND",
            NotFoundError::FlagEnvironmentConfig { .. } => "FLAG_CONFIG_NOT_FOUND",
        }
    }
}

/// Error returned by every HTTP handler, rendered as `{ "error": ..., "code": ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    /// Opaque 500. The detail goes to the log, not to the caller.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, err.code(), err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::internal(err)
    }
}

impl From<UnknownValueType> for ApiError {
    fn from(err: UnknownValueType) -> Self {
        ApiError::internal(err)
    }
}

impl From<ProjectValidationError> for ApiError {
    fn from(err: ProjectValidationError) -> Self {
        ApiError::bad_request("INVALID_PROJECT", err.to_string())
    }
}

impl From<EnvironmentValidationError> for ApiError {
    fn from(err: EnvironmentValidationError) -> Self {
        ApiError::bad_request("INVALID_ENVIRONMENT", err.to_string())
    }
}

impl From<FlagValidationError> for ApiError {
    fn from(err: FlagValidationError) -> Self {
        ApiError::bad_request("INVALID_FLAG", err.to_string())
    }
}

impl From<GateValidationError> for ApiError {
    fn from(err: GateValidationError) -> Self {
        match err {
            GateValidationError::GateNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "GATE_NOT_FOUND", err.to_string())
            }
            other => ApiError::bad_request("INVALID_GATES", other.to_string()),
        }
    }
}

impl From<ConfigValidationError> for ApiError {
    fn from(err: ConfigValidationError) -> Self {
        match err {
            ConfigValidationError::Gates(gates) => gates.into(),
            other => ApiError::bad_request("INVALID_CONFIG", other.to_string()),
        }
    }
}

/// Postgres unique-constraint violation (SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_error| db_error.code())
        .is_some_and(|code| code == "23505")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_codes_are_distinct() {
        let err: ApiError = NotFoundError::Flag("beta".to_string()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "FLAG_NOT_FOUND");

        let err: ApiError = NotFoundError::FlagEnvironmentConfig {
            flag: "beta".to_string(),
            environment: "production".to_string(),
        }
        .into();
        assert_eq!(err.code, "FLAG_CONFIG_NOT_FOUND");
    }

    #[test]
    fn test_validation_message_is_surfaced_verbatim() {
        let err: ApiError = FlagValidationError::NameRequired.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Flag name is required");
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let err = ApiError::internal("connection reset by peer");
        assert_eq!(err.code, "INTERNAL_ERROR");
        assert!(!err.message.contains("connection reset"));
    }
}
