use crate::db::models::api::ApiResponse;
use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        field: Option<String>,
        code: Option<String>,
    },

    // 非法的状态流转（工作流实例、督办事项等）
    #[error("Invalid state: {message}")]
    InvalidState { message: String, code: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth { .. } | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::InvalidState { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let response = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                ApiResponse::<()>::internal_error("Database error")
            }
            AppError::Pool(ref e) => {
                tracing::error!("Connection pool error: {}", e);
                ApiResponse::<()>::internal_error("Connection error")
            }
            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                ApiResponse::<()>::internal_error("Cache error")
            }
            AppError::Auth { ref message } => ApiResponse::<()>::unauthorized(message),
            AppError::Forbidden { ref message } => ApiResponse::<()>::forbidden(message),
            AppError::Validation { ref message } => ApiResponse::<()>::bad_request(message),
            AppError::NotFound { ref resource } => {
                ApiResponse::<()>::not_found(&format!("{} not found", resource))
            }
            AppError::Conflict {
                ref message,
                ref field,
                ref code,
            } => ApiResponse::<()>::conflict(message, field.clone(), code.as_deref().unwrap_or("")),
            AppError::InvalidState {
                ref message,
                ref code,
            } => ApiResponse::<()>::unprocessable(message, code),
            AppError::Config(ref e) => {
                tracing::error!("Configuration error: {}", e);
                ApiResponse::<()>::internal_error("Configuration error")
            }
            AppError::Jwt(ref e) => {
                tracing::debug!("JWT error: {}", e);
                ApiResponse::<()>::unauthorized("Invalid token")
            }
            AppError::Bcrypt(ref e) => {
                tracing::error!("Bcrypt error: {}", e);
                ApiResponse::<()>::internal_error("Password processing error")
            }
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                ApiResponse::<()>::internal_error("Internal server error")
            }
        };

        (status, Json(response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

// 便捷的错误创建函数
impl AppError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict_with_code(
        message: impl Into<String>,
        field: Option<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            message: message.into(),
            field,
            code: Some(code.into()),
        }
    }

    pub fn invalid_state(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
            code: code.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::auth("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("item").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::invalid_state("already started", "WORKFLOW_NOT_DRAFT").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_keeps_status() {
        let resp = AppError::forbidden("not your task").into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
