use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use std::fmt;

/// One failed input field, reported in the `meta` of a validation error.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError { field: field.to_string(), message: message.into() }
    }
}

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Hash(String),
    Internal(String),
    NotFound(String),
    BadRequest(String),
    Validation(Vec<FieldError>),
    Conflict(String),
    Unauthorized(String),
    Session(String),
    PermissionDenied(String),
}

/// Error envelope written for every failed request.
#[derive(Serialize)]
struct ErrorBody<'a> {
    message: String,
    meta: &'a serde_json::Value,
}

impl AppError {
    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        AppError::NotFound(format!("{entity} with id {id} does not exist"))
    }

    fn meta(&self) -> serde_json::Value {
        match self {
            AppError::Validation(fields) => serde_json::to_value(fields).unwrap_or_default(),
            _ => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
            AppError::Internal(e) => write!(f, "{e}"),
            AppError::NotFound(e) => write!(f, "{e}"),
            AppError::BadRequest(e) => write!(f, "{e}"),
            AppError::Validation(_) => write!(f, "Validation failed"),
            AppError::Conflict(e) => write!(f, "{e}"),
            AppError::Unauthorized(e) => write!(f, "{e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::PermissionDenied(e) => write!(f, "Permission denied: {e}"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) | AppError::Session(_) | AppError::PermissionDenied(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Db(_) | AppError::Hash(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        }
        let meta = self.meta();
        HttpResponse::build(status).json(ErrorBody { message: self.to_string(), meta: &meta })
    }
}

/// Postgres unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres foreign-key-violation SQLSTATE.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Turn a constraint name such as `students_nusnet_id_cohort_year_key` into
/// the list of fields it covers (`nusnet_id, cohort_year`).
fn constraint_fields(constraint: &str) -> String {
    let trimmed = constraint
        .strip_suffix("_key")
        .unwrap_or(constraint);
    let tables = [
        "evaluation_relations", "administrators", "advisers", "mentors", "students",
        "projects", "deadlines", "submissions", "users",
    ];
    let fields = tables
        .iter()
        .find_map(|t| trimmed.strip_prefix(t).and_then(|r| r.strip_prefix('_')))
        .unwrap_or(trimmed);
    let known = [
        "matriculation_no", "nusnet_id", "cohort_year", "user_id", "from_project_id",
        "to_project_id", "academic_year",
    ];
    let mut out = Vec::new();
    let mut rest = fields;
    while !rest.is_empty() {
        match known.iter().find(|k| rest.starts_with(*k)) {
            Some(k) => {
                out.push(k.to_string());
                rest = rest[k.len()..].trim_start_matches('_');
            }
            None => {
                let (head, tail) = rest.split_once('_').unwrap_or((rest, ""));
                out.push(head.to_string());
                rest = tail;
            }
        }
    }
    out.join(", ")
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return AppError::NotFound("Requested record does not exist".to_string());
        }
        if let Some(db_err) = e.as_database_error() {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    let fields = db_err.constraint().map(constraint_fields).unwrap_or_default();
                    return AppError::Conflict(format!("Unique constraint failed on: {fields}"));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    let constraint = db_err.constraint().unwrap_or("unknown");
                    return AppError::BadRequest(format!(
                        "Foreign key constraint failed: {constraint}"
                    ));
                }
                _ => {}
            }
        }
        AppError::Db(e)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn constraint_fields_splits_known_columns() {
        assert_eq!(
            constraint_fields("students_nusnet_id_cohort_year_key"),
            "nusnet_id, cohort_year"
        );
        assert_eq!(
            constraint_fields("evaluation_relations_from_project_id_to_project_id_key"),
            "from_project_id, to_project_id"
        );
        assert_eq!(constraint_fields("users_email_key"), "email");
        assert_eq!(constraint_fields("projects_name_cohort_year_key"), "name, cohort_year");
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::not_found("Project", 3).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::PermissionDenied("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn validation_error_lists_fields_in_meta() {
        let err = AppError::Validation(vec![FieldError::new("email", "Email is required")]);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Validation failed");
        assert_eq!(json["meta"][0]["field"], "email");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
