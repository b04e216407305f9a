use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::errors::AppError;
use crate::mailer::SharedMailer;
use crate::models::application::{self, ApplicationQuery, NewApplication};

/// Everything but submission, which is mounted publicly.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/applications", web::get().to(list))
        .route("/applications/{id}", web::get().to(read))
        .route("/applications/{id}", web::delete().to(withdraw))
        .route("/applications/{id}/approve", web::post().to(approve))
        .route("/applications/{id}/reject", web::post().to(reject));
}

/// POST /api/applications. No session required.
pub async fn submit(pool: web::Data<PgPool>, body: web::Json<NewApplication>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Created().json(application::submit(&pool, &body).await?))
}

/// Administrator of the cohort the application was submitted to.
async fn require_admin_for(pool: &PgPool, session: &Session, id: i64) -> Result<Principal, AppError> {
    let found = application::get(pool, id).await?;
    Principal::admin_of(pool, session, found.cohort_year).await
}

/// GET /api/applications?cohortYear=&status=&search=&page=&limit=
/// Lists one cohort, the current one when `cohortYear` is absent.
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<ApplicationQuery>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::load(&pool, &session, query.cohort_year).await?;
    me.require_admin()?;
    let query = ApplicationQuery { cohort_year: Some(me.cohort_year), ..query.into_inner() };
    Ok(HttpResponse::Ok().json(application::find_all(&pool, &query).await?))
}

pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    require_admin_for(&pool, &session, id).await?;
    Ok(HttpResponse::Ok().json(application::get_detail(&pool, id).await?))
}

/// Creates the team and both student accounts, then marks the application
/// approved. On any row failure the status is left as it was.
pub async fn approve(
    pool: web::Data<PgPool>,
    session: Session,
    mailer: web::Data<SharedMailer>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = require_admin_for(&pool, &session, id).await?;
    let approved = application::approve(&pool, &mailer, id).await?;
    log::info!("Application {} approved by user {}", approved.submission_id, me.user_id);
    Ok(HttpResponse::Ok().json(approved))
}

pub async fn reject(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = require_admin_for(&pool, &session, id).await?;
    let rejected = application::reject(&pool, id).await?;
    log::info!("Application {} rejected by user {}", rejected.submission_id, me.user_id);
    Ok(HttpResponse::Ok().json(rejected))
}

/// DELETE /api/applications/{id}: removes the application and its submission.
pub async fn withdraw(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    require_admin_for(&pool, &session, id).await?;
    application::withdraw(&pool, id).await?;
    Ok(HttpResponse::NoContent().finish())
}
