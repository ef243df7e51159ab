use crate::domain::error::AppError;

/// Minimal shape check; real deliverability is the mail provider's
/// problem.
pub fn validate_email(raw: &str, field: &str) -> Result<String, AppError> {
    let email = raw.trim();
    let ok = email.len() <= 255
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        })
        && !email.contains(char::is_whitespace);
    if !ok {
        return Err(AppError::Validation(format!(
            "valid {field} is required"
        )));
    }
    Ok(email.to_string())
}

/// Trim a required string field and enforce its length bound.
pub fn required_text(raw: &str, field: &str, max: usize) -> Result<String, AppError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.len() > max {
        return Err(AppError::Validation(format!(
            "{field} must be less than {max} characters"
        )));
    }
    Ok(value.to_string())
}

/// Trim an optional string field; empty collapses to `None`.
pub fn optional_text(
    raw: Option<String>,
    field: &str,
    max: usize,
) -> Result<Option<String>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) => {
            let value = s.trim();
            if value.is_empty() {
                return Ok(None);
            }
            if value.len() > max {
                return Err(AppError::Validation(format!(
                    "{field} must be less than {max} characters"
                )));
            }
            Ok(Some(value.to_string()))
        }
    }
}
