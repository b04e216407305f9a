use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::errors::AppError;
use crate::models::cohort::{self, CohortUpdate, NewCohort};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/cohorts", web::get().to(list))
        .route("/cohorts", web::post().to(create))
        .route("/cohorts/current", web::get().to(current))
        .route("/cohorts/{year}", web::get().to(read))
        .route("/cohorts/{year}", web::put().to(update))
        .route("/cohorts/{year}", web::delete().to(delete));
}

/// Administrators of the current cohort manage cohorts.
async fn require_admin(pool: &PgPool, session: &Session) -> Result<(), AppError> {
    Principal::load(pool, session, None).await?.require_admin()
}

pub async fn list(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(cohort::find_all(&pool).await?))
}

pub async fn current(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let found = cohort::find_current(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No cohort has been created yet".to_string()))?;
    Ok(HttpResponse::Ok().json(found))
}

pub async fn read(pool: web::Data<PgPool>, path: web::Path<i32>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(cohort::get_by_year(&pool, path.into_inner()).await?))
}

pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewCohort>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    let created = cohort::create(&pool, &body).await?;
    log::info!("Created cohort {}", created.academic_year);
    Ok(HttpResponse::Created().json(created))
}

pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i32>,
    body: web::Json<CohortUpdate>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    Ok(HttpResponse::Ok().json(cohort::update(&pool, path.into_inner(), &body).await?))
}

pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    let year = path.into_inner();
    cohort::delete(&pool, year).await?;
    log::info!("Deleted cohort {year}");
    Ok(HttpResponse::NoContent().finish())
}
