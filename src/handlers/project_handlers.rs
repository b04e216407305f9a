use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::auth::validate;
use crate::errors::AppError;
use crate::mailer::SharedMailer;
use crate::models::common::{Pagination, search_pattern};
use crate::models::onboarding::{self, TeamRow};
use crate::models::project::{self, NewProject, ProjectQuery, ProjectUpdate};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TeamBatch {
    pub cohort_year: i32,
    pub projects: Vec<TeamRow>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/projects", web::get().to(list))
        .route("/projects", web::post().to(create))
        .route("/projects/batch", web::post().to(create_batch))
        .route("/projects/{id}", web::get().to(read))
        .route("/projects/{id}", web::put().to(update))
        .route("/projects/{id}", web::delete().to(delete));
}

/// GET /api/projects?cohortYear=&search=&achievement=&page=&limit=
pub async fn list(pool: web::Data<PgPool>, query: web::Query<ProjectQuery>) -> Result<HttpResponse, AppError> {
    let page = Pagination::from_params(query.page, query.limit)?;
    let pattern = search_pattern(query.search.as_deref());
    let projects =
        project::find_all(&pool, query.cohort_year, pattern.as_deref(), query.achievement, page).await?;
    Ok(HttpResponse::Ok().json(projects))
}

pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewProject>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::admin_of(&pool, &session, body.cohort_year).await?;
    if let Some(e) = validate::validate_required("name", &body.name, 200) {
        return Err(AppError::Validation(vec![e]));
    }
    let detail = project::create(&pool, &body).await?;
    log::info!("Project {} '{}' created by user {}", detail.project.id, detail.project.name, me.user_id);
    Ok(HttpResponse::Created().json(detail))
}

/// POST /api/projects/batch: one team per row, each with its students.
pub async fn create_batch(
    pool: web::Data<PgPool>,
    session: Session,
    mailer: web::Data<SharedMailer>,
    body: web::Json<TeamBatch>,
) -> Result<HttpResponse, AppError> {
    Principal::admin_of(&pool, &session, body.cohort_year).await?;
    let outcome = onboarding::create_teams(&pool, &mailer, body.cohort_year, &body.projects).await;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn read(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(project::get_detail(&pool, path.into_inner()).await?))
}

pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<ProjectUpdate>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    Principal::admin_of(&pool, &session, project::get(&pool, id).await?.cohort_year).await?;
    if let Some(e) = body.name.as_deref().and_then(|n| validate::validate_required("name", n, 200)) {
        return Err(AppError::Validation(vec![e]));
    }
    Ok(HttpResponse::Ok().json(project::update(&pool, id, &body).await?))
}

/// DELETE /api/projects/{id}. Relations touching the project go with it.
pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = Principal::admin_of(&pool, &session, project::get(&pool, id).await?.cohort_year).await?;
    project::delete(&pool, id).await?;
    log::info!("Project {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}
