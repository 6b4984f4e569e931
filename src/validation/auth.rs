use crate::error::AppError;

pub fn validate_login_request(username: &str, password: &str) -> Result<(), AppError> {
    if username.trim().is_empty() {
        return Err(AppError::validation("Username is required"));
    }

    if password.is_empty() {
        return Err(AppError::validation("Password is required"));
    }

    Ok(())
}

pub fn validate_change_password(old_password: &str, new_password: &str) -> Result<(), AppError> {
    if new_password.len() < 8 {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }

    if old_password == new_password {
        return Err(AppError::validation(
            "New password must differ from the current password",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_both_fields() {
        assert!(validate_login_request("admin", "secret").is_ok());
        assert!(validate_login_request("  ", "secret").is_err());
        assert!(validate_login_request("admin", "").is_err());
    }

    #[test]
    fn test_change_password_rules() {
        assert!(validate_change_password("OldPass#1", "NewPass#2").is_ok());
        assert!(validate_change_password("OldPass#1", "OldPass#1").is_err());
        assert!(validate_change_password("OldPass#1", "short").is_err());
    }
}
