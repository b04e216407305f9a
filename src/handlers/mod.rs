pub mod announcement_handlers;
pub mod application_handlers;
pub mod auth_handlers;
pub mod cohort_handlers;
pub mod dashboard;
pub mod deadline_handlers;
pub mod forum_handlers;
pub mod project_handlers;
pub mod relation_handlers;
pub mod role_handlers;
pub mod submission_handlers;
pub mod user_handlers;
pub mod vote_event_handlers;

use actix_web::{HttpRequest, error, guard, middleware::from_fn, web};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::{require_auth, require_json_content_type};
use crate::errors::{AppError, FieldError};

/// `?cohortYear=` selecting which cohort the caller's roles are resolved in.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortParam {
    pub cohort_year: Option<i32>,
}

/// Result of a delete or batch call that only reports a count.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(vec![FieldError::new("body", err.to_string())]).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(vec![FieldError::new("query", err.to_string())]).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(vec![FieldError::new("path", err.to_string())]).into()
}

/// Extractor settings that report malformed input with the error envelope.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error));
}

/// Routes mounted under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    extractor_config(cfg);

    cfg.service(
        web::scope("/auth")
            .wrap(from_fn(require_json_content_type))
            .route("/login", web::post().to(auth_handlers::login))
            .route("/logout", web::post().to(auth_handlers::logout))
            .route("/password-reset/request", web::post().to(auth_handlers::request_reset))
            .route("/password-reset/confirm", web::post().to(auth_handlers::confirm_reset))
            .service(
                web::scope("")
                    .wrap(from_fn(require_auth))
                    .route("/me", web::get().to(auth_handlers::me)),
            ),
    );
    // Applicants and external voters have no account. The POST guard lets
    // other methods on these paths fall through to the authenticated scope.
    cfg.service(
        web::resource("/applications")
            .guard(guard::Post())
            .wrap(from_fn(require_json_content_type))
            .to(application_handlers::submit),
    );
    cfg.service(
        web::resource("/vote-events/{id}/external-votes")
            .guard(guard::Post())
            .wrap(from_fn(require_json_content_type))
            .to(vote_event_handlers::cast_external_vote),
    );

    cfg.service(
        web::scope("")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .configure(cohort_handlers::configure)
            .configure(user_handlers::configure)
            .configure(role_handlers::configure)
            .configure(project_handlers::configure)
            .configure(deadline_handlers::configure)
            .configure(submission_handlers::configure)
            .configure(relation_handlers::configure)
            .configure(application_handlers::configure)
            .configure(dashboard::configure)
            .configure(announcement_handlers::configure)
            .configure(forum_handlers::configure)
            .configure(vote_event_handlers::configure),
    );
}
