use uuid::Uuid;

use crate::db::models::AuthUser;
use crate::error::{AppError, AppResult};

pub mod permissions {
    pub const SUPERVISION_READ: &str = "supervision:read";
    pub const SUPERVISION_CREATE: &str = "supervision:create";
    pub const SUPERVISION_UPDATE: &str = "supervision:update";
    pub const SUPERVISION_DELETE: &str = "supervision:delete";
    pub const WORKFLOW_MANAGE: &str = "workflow:manage";
    pub const USER_MANAGE: &str = "user:manage";
    pub const DEPARTMENT_MANAGE: &str = "department:manage";
    pub const SYSTEM_CONFIG: &str = "system:config";
}

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub department_id: Option<Uuid>,
    pub role_ids: Vec<Uuid>,
    pub permissions: Vec<String>,
    pub is_superuser: bool,
}

impl From<&AuthUser> for RequestContext {
    fn from(user: &AuthUser) -> Self {
        Self {
            user_id: user.id,
            department_id: user.department_id,
            role_ids: user.role_ids.clone(),
            permissions: user.permissions.clone(),
            is_superuser: user.is_superuser,
        }
    }
}

impl RequestContext {
    /// 后台任务使用的系统上下文
    pub fn system() -> Self {
        Self {
            user_id: Uuid::nil(),
            department_id: None,
            role_ids: Vec::new(),
            permissions: Vec::new(),
            is_superuser: true,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_superuser || self.permissions.iter().any(|p| p == permission)
    }

    pub fn require(&self, permission: &str) -> AppResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Missing permission: {}",
                permission
            )))
        }
    }
}
