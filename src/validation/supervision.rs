use chrono::{DateTime, Utc};

use crate::error::AppError;

pub fn validate_schedule(
    start_date: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if let (Some(start), Some(deadline)) = (start_date, deadline) {
        if deadline <= start {
            return Err(AppError::validation("Deadline must be after the start date"));
        }
    }
    Ok(())
}

/// 评分范围 0-5
pub fn validate_evaluation_scores(scores: &[f64]) -> Result<(), AppError> {
    if scores.iter().any(|s| !s.is_finite() || *s < 0.0 || *s > 5.0) {
        return Err(AppError::validation("Score must be between 0 and 5"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_schedule() {
        let start = Utc::now();
        assert!(validate_schedule(Some(start), Some(start + Duration::days(3))).is_ok());
        assert!(validate_schedule(Some(start), Some(start)).is_err());
        assert!(validate_schedule(Some(start), Some(start - Duration::days(1))).is_err());
        assert!(validate_schedule(None, Some(start)).is_ok());
        assert!(validate_schedule(None, None).is_ok());
    }

    #[test]
    fn test_evaluation_scores() {
        assert!(validate_evaluation_scores(&[0.0, 2.5, 5.0]).is_ok());
        assert!(validate_evaluation_scores(&[5.1]).is_err());
        assert!(validate_evaluation_scores(&[-1.0]).is_err());
        assert!(validate_evaluation_scores(&[f64::NAN]).is_err());
    }
}
