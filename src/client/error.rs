use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// 连接失败、超时等，没有拿到 HTTP 响应
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request failed with status {status}")]
    Status { status: u16, message: Option<String> },

    /// 刷新令牌失败或刷新后仍被拒绝，本地会话已清除
    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// 面向用户的提示：优先使用服务端返回的 message，否则按状态码给出通用文案
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => "Network error, please check your connection".to_string(),
            ClientError::SessionExpired | ClientError::NotAuthenticated => {
                "Session expired, please log in again".to_string()
            }
            ClientError::Status { status, message } => {
                let fallback = match status {
                    401 => "Authentication failed",
                    403 => "You do not have permission to perform this action",
                    404 => "The requested resource was not found",
                    422 => "The request could not be processed",
                    500 => "Internal server error, please try again later",
                    _ => return "Request failed".to_string(),
                };
                message
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(fallback)
                    .to_string()
            }
            ClientError::Decode(_) | ClientError::InvalidUrl(_) | ClientError::Storage(_) => {
                "Request failed".to_string()
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_message_wins_for_known_statuses() {
        let err = ClientError::Status {
            status: 422,
            message: Some("Workflow is active, only draft workflows can be started".to_string()),
        };
        assert_eq!(
            err.user_message(),
            "Workflow is active, only draft workflows can be started"
        );
    }

    #[test]
    fn generic_fallbacks() {
        let forbidden = ClientError::Status { status: 403, message: None };
        assert_eq!(
            forbidden.user_message(),
            "You do not have permission to perform this action"
        );

        let blank = ClientError::Status { status: 404, message: Some("  ".to_string()) };
        assert_eq!(blank.user_message(), "The requested resource was not found");

        // 其他状态码不透出服务端文案
        let teapot = ClientError::Status { status: 418, message: Some("teapot".to_string()) };
        assert_eq!(teapot.user_message(), "Request failed");
    }

    #[test]
    fn network_is_distinct_from_status() {
        let err = ClientError::Network("connection refused".to_string());
        assert_eq!(err.status(), None);
        assert!(err.user_message().contains("Network"));
    }
}
