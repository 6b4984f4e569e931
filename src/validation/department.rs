use uuid::Uuid;

use crate::error::AppError;

pub fn validate_department_code(code: &str) -> Result<(), AppError> {
    if code.trim().is_empty() {
        return Err(AppError::validation("Department code is required"));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::validation(
            "Department code can only contain letters, numbers, underscores and hyphens",
        ));
    }

    Ok(())
}

/// `ancestors` 为新上级部门向上的完整链路，自身出现在其中即形成环
pub fn validate_parent_chain(
    dept_id: Uuid,
    new_parent: Uuid,
    ancestors: &[Uuid],
) -> Result<(), AppError> {
    if dept_id == new_parent || ancestors.contains(&dept_id) {
        return Err(AppError::validation(
            "A department cannot be moved under itself or its descendants",
        ));
    }
    Ok(())
}
