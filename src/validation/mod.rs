pub mod auth;
pub mod department;
pub mod supervision;
pub mod user;
pub mod workflow;

use axum::{
    Json, async_trait,
    extract::FromRequest,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::{
    db::models::api::{ApiResponse, ErrorDetail},
    error::AppError,
};

/// 验证的 JSON 提取器
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S, axum::body::Body> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request<axum::body::Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            AppError::validation(format!("Invalid JSON format: {}", e.body_text())).into_response()
        })?;

        value
            .validate()
            .map_err(|errors| validation_error_response(error_details(&errors)).into_response())?;

        Ok(ValidatedJson(value))
    }
}

/// 按字段展开校验错误，字段名排序保证输出稳定
pub fn error_details(errors: &ValidationErrors) -> Vec<ErrorDetail> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| ErrorDetail {
                field: Some(field.to_string()),
                code: error.code.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation failed for field: {}", field)),
            })
        })
        .collect()
}

/// 验证错误响应辅助函数
pub fn validation_error_response(errors: Vec<ErrorDetail>) -> (StatusCode, Json<ApiResponse<()>>) {
    let response = ApiResponse::validation_error(errors);
    (StatusCode::BAD_REQUEST, Json(response))
}

/// 常用验证规则
pub mod rules {
    use validator::ValidationError;

    /// 验证密码强度
    pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
        let mut score = 0;

        if password.chars().count() >= 8 {
            score += 1;
        }
        if password.chars().any(|c| c.is_lowercase()) {
            score += 1;
        }
        if password.chars().any(|c| c.is_uppercase()) {
            score += 1;
        }
        if password.chars().any(|c| c.is_numeric()) {
            score += 1;
        }
        if password.chars().any(|c| "!@#$%^&*()_+-=[]{}|;:,.<>?".contains(c)) {
            score += 1;
        }

        if score < 3 {
            return Err(ValidationError::new("weak_password"));
        }
        Ok(())
    }

    /// 只允许字母、数字、下划线和连字符，不能以数字开头
    pub fn validate_username_format(username: &str) -> Result<(), ValidationError> {
        if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(ValidationError::new("invalid_username_format"));
        }
        if username.chars().next().is_some_and(|c| c.is_numeric()) {
            return Err(ValidationError::new("username_starts_with_number"));
        }
        Ok(())
    }

}
