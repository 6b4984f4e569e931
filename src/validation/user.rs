use crate::error::AppError;
use crate::services::context::permissions;

/// 角色可以授予的权限
pub const KNOWN_PERMISSIONS: &[&str] = &[
    permissions::SUPERVISION_READ,
    permissions::SUPERVISION_CREATE,
    permissions::SUPERVISION_UPDATE,
    permissions::SUPERVISION_DELETE,
    permissions::WORKFLOW_MANAGE,
    permissions::USER_MANAGE,
    permissions::DEPARTMENT_MANAGE,
    permissions::SYSTEM_CONFIG,
];

pub fn validate_permissions(perms: &[String]) -> Result<(), AppError> {
    if let Some(unknown) = perms.iter().find(|p| !KNOWN_PERMISSIONS.contains(&p.as_str())) {
        return Err(AppError::validation(format!(
            "Unknown permission: {}",
            unknown
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_permissions_pass() {
        let perms = vec!["supervision:read".to_string(), "user:manage".to_string()];
        assert!(validate_permissions(&perms).is_ok());
        assert!(validate_permissions(&[]).is_ok());
    }

    #[test]
    fn test_unknown_permission_rejected() {
        let perms = vec!["supervision:read".to_string(), "root".to_string()];
        assert!(validate_permissions(&perms).is_err());
    }
}
