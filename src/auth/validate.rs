use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{AppError, FieldError};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
/// `A0123456X`: A, seven digits, one check letter.
static MATRICULATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^A\d{7}[A-Z]$").expect("valid matriculation regex"));
/// `E0123456`: E followed by seven digits.
static NUSNET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^E\d{7}$").expect("valid nusnet regex"));

/// Validate an email: non-empty, max 254 chars, `local@domain.tld` shape.
pub fn validate_email(field: &str, email: &str) -> Option<FieldError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Some(FieldError::new(field, "Email is required"));
    }
    if trimmed.len() > 254 {
        return Some(FieldError::new(field, "Email must be at most 254 characters"));
    }
    if !EMAIL_RE.is_match(trimmed) {
        return Some(FieldError::new(field, format!("'{trimmed}' is not a valid email")));
    }
    None
}

pub fn validate_matriculation_no(field: &str, value: &str) -> Option<FieldError> {
    if MATRICULATION_RE.is_match(value.trim()) {
        None
    } else {
        Some(FieldError::new(
            field,
            format!("'{}' is not a valid matriculation number", value.trim()),
        ))
    }
}

pub fn validate_nusnet_id(field: &str, value: &str) -> Option<FieldError> {
    if NUSNET_RE.is_match(value.trim()) {
        None
    } else {
        Some(FieldError::new(field, format!("'{}' is not a valid NUSNET ID", value.trim())))
    }
}

/// Validate a password: min 8 chars.
pub fn validate_password(field: &str, password: &str) -> Option<FieldError> {
    if password.is_empty() {
        return Some(FieldError::new(field, "Password is required"));
    }
    if password.len() < 8 {
        return Some(FieldError::new(field, "Password must be at least 8 characters"));
    }
    None
}

/// Validate a required text field with a max length.
pub fn validate_required(field: &str, value: &str, max_len: usize) -> Option<FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(FieldError::new(field, format!("{field} is required")));
    }
    if trimmed.len() > max_len {
        return Some(FieldError::new(field, format!("{field} must be at most {max_len} characters")));
    }
    None
}

/// Validate an optional text field with a max length (absent or empty is OK).
pub fn validate_optional(field: &str, value: Option<&str>, max_len: usize) -> Option<FieldError> {
    match value.map(str::trim) {
        Some(v) if v.len() > max_len => {
            Some(FieldError::new(field, format!("{field} must be at most {max_len} characters")))
        }
        _ => None,
    }
}

/// Collect field errors; `Ok(())` when there are none.
pub fn finish(errors: Vec<FieldError>) -> Result<(), AppError> {
    if errors.is_empty() { Ok(()) } else { Err(AppError::Validation(errors)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(validate_email("email", "student@u.nus.edu").is_none());
        assert!(validate_email("email", "").is_some());
        assert!(validate_email("email", "no-at-sign.com").is_some());
        assert!(validate_email("email", "a@b").is_some());
    }

    #[test]
    fn matriculation_numbers() {
        assert!(validate_matriculation_no("m", "A0123456X").is_none());
        assert!(validate_matriculation_no("m", " A0123456X ").is_none());
        assert!(validate_matriculation_no("m", "A012345X").is_some());
        assert!(validate_matriculation_no("m", "B0123456X").is_some());
        assert!(validate_matriculation_no("m", "A0123456").is_some());
    }

    #[test]
    fn nusnet_ids() {
        assert!(validate_nusnet_id("n", "E0123456").is_none());
        assert!(validate_nusnet_id("n", "E012345").is_some());
        assert!(validate_nusnet_id("n", "e0123456").is_some());
    }

    #[test]
    fn finish_reports_all_fields() {
        let errors: Vec<FieldError> = [
            validate_required("name", "", 10),
            validate_password("password", "short"),
            validate_optional("intro", Some("ok"), 10),
        ]
        .into_iter()
        .flatten()
        .collect();
        match finish(errors) {
            Err(AppError::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["name", "password"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
