use crate::error::AppError;

/// 模板编码：大写字母开头，仅含大写字母、数字、下划线
pub fn validate_template_code(code: &str) -> Result<(), AppError> {
    let mut chars = code.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => {
            return Err(AppError::validation(
                "Template code must start with an uppercase letter",
            ));
        }
    }
    if !chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        return Err(AppError::validation(
            "Template code can only contain uppercase letters, numbers and underscores",
        ));
    }
    Ok(())
}

pub fn validate_variables(variables: &serde_json::Value) -> Result<(), AppError> {
    if !variables.is_object() {
        return Err(AppError::validation("Workflow variables must be a JSON object"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_code() {
        assert!(validate_template_code("SUPERVISION_APPROVAL").is_ok());
        assert!(validate_template_code("FLOW2").is_ok());
        assert!(validate_template_code("").is_err());
        assert!(validate_template_code("2FLOW").is_err());
        assert!(validate_template_code("Flow").is_err());
        assert!(validate_template_code("FLOW-A").is_err());
    }

    #[test]
    fn test_variables_must_be_object() {
        assert!(validate_variables(&json!({"amount": 3})).is_ok());
        assert!(validate_variables(&json!([1, 2])).is_err());
        assert!(validate_variables(&json!("x")).is_err());
    }
}
