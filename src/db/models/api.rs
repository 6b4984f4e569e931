use serde::{Deserialize, Serialize};

// 统一API响应结构
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub code: String,
    pub message: String,
}

// 便捷构造函数
impl<T> ApiResponse<T> {
    fn build(
        success: bool,
        code: u16,
        message: &str,
        data: Option<T>,
        errors: Option<Vec<ErrorDetail>>,
    ) -> Self {
        Self {
            success,
            code,
            message: message.to_string(),
            data,
            errors,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn failure(code: u16, error_code: &str, field: Option<String>, message: &str) -> Self {
        Self::build(
            false,
            code,
            message,
            None,
            Some(vec![ErrorDetail {
                field,
                code: error_code.to_string(),
                message: message.to_string(),
            }]),
        )
    }

    pub fn success(data: T, message: &str) -> Self {
        Self::build(true, 200, message, Some(data), None)
    }

    pub fn created(data: T, message: &str) -> Self {
        Self::build(true, 201, message, Some(data), None)
    }

    pub fn ok(message: &str) -> Self {
        Self::build(true, 200, message, None, None)
    }

    pub fn validation_error(errors: Vec<ErrorDetail>) -> Self {
        Self::build(false, 400, "Validation failed", None, Some(errors))
    }

    pub fn bad_request(message: &str) -> Self {
        Self::failure(400, "BAD_REQUEST", None, message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::failure(401, "UNAUTHORIZED", None, message)
    }

    pub fn forbidden(message: &str) -> Self {
        Self::failure(403, "FORBIDDEN", None, message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::failure(404, "NOT_FOUND", None, message)
    }

    pub fn conflict(message: &str, field: Option<String>, error_code: &str) -> Self {
        Self::failure(409, error_code, field, message)
    }

    pub fn unprocessable(message: &str, error_code: &str) -> Self {
        Self::failure(422, error_code, None, message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::failure(500, "INTERNAL_ERROR", None, message)
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// 列表查询的分页参数，同时兼容 `page`/`size` 与 `skip`/`limit` 两种写法
#[derive(Deserialize, Debug, Default, Clone)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub size: i64,
    pub offset: i64,
}

impl PageQuery {
    /// `skip`/`limit` wins when present; otherwise `page` is 1-based.
    pub fn normalize(&self) -> PageParams {
        if self.skip.is_some() || self.limit.is_some() {
            let size = self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE);
            let offset = self.skip.unwrap_or(0).max(0);
            return PageParams {
                page: (offset / size).saturating_add(1),
                size,
                offset,
            };
        }

        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = self.page.unwrap_or(1).max(1);
        PageParams {
            page,
            size,
            offset: (page - 1).saturating_mul(size),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            size: params.size,
            pages: total_pages(total, params.size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
        }
    }
}

pub fn total_pages(total: i64, size: i64) -> i64 {
    if total <= 0 || size <= 0 {
        0
    } else {
        (total + size - 1) / size
    }
}

// 业务错误码常量
pub mod error_codes {
    // 认证相关
    pub const AUTH_INVALID_CREDENTIALS: &str = "AUTH_001";
    pub const AUTH_ACCOUNT_DISABLED: &str = "AUTH_002";
    pub const AUTH_INVALID_TOKEN: &str = "AUTH_003";
    pub const AUTH_TOKEN_REVOKED: &str = "AUTH_004";

    // 用户/部门相关
    pub const USER_USERNAME_EXISTS: &str = "USER_001";
    pub const ROLE_CODE_EXISTS: &str = "ROLE_001";
    pub const DEPARTMENT_CODE_EXISTS: &str = "DEPT_001";
    pub const DEPARTMENT_IN_USE: &str = "DEPT_002";

    // 督办相关
    pub const SUPERVISION_INVALID_TRANSITION: &str = "SUP_001";
    pub const SUPERVISION_CLOSED: &str = "SUP_002";
    pub const TASK_INVALID_TRANSITION: &str = "SUP_003";

    // 工作流相关
    pub const WORKFLOW_TEMPLATE_CODE_EXISTS: &str = "WF_001";
    pub const WORKFLOW_TEMPLATE_IN_USE: &str = "WF_002";
    pub const WORKFLOW_TEMPLATE_BUILTIN: &str = "WF_003";
    pub const WORKFLOW_TEMPLATE_DISABLED: &str = "WF_004";
    pub const WORKFLOW_INVALID_TRANSITION: &str = "WF_005";
    pub const WORKFLOW_NODE_NOT_ACTIVE: &str = "WF_006";
    pub const WORKFLOW_NO_ROUTE: &str = "WF_007";

    // 通知相关
    pub const NOTIFICATION_CONFIRM_NOT_REQUIRED: &str = "NTF_001";
}
