use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::errors::AppError;
use crate::models::deadline::{self, DeadlineQuery, DeadlineUpdate, NewDeadline, NewSection};

/// Body of `PUT /deadlines/{id}/questions`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuestionsReplace {
    pub sections: Vec<NewSection>,
}

/// Administrator of the deadline's cohort.
async fn require_admin_for(pool: &PgPool, session: &Session, id: i64) -> Result<Principal, AppError> {
    let found = deadline::get(pool, id).await?;
    Principal::admin_of(pool, session, found.cohort_year).await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/deadlines", web::get().to(list))
        .route("/deadlines", web::post().to(create))
        .route("/deadlines/{id}", web::get().to(read))
        .route("/deadlines/{id}", web::put().to(update))
        .route("/deadlines/{id}", web::delete().to(delete))
        .route("/deadlines/{id}/questions", web::put().to(replace_questions));
}

/// GET /api/deadlines?cohortYear=&type=&search=
pub async fn list(pool: web::Data<PgPool>, query: web::Query<DeadlineQuery>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(deadline::find_all(&pool, &query).await?))
}

pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewDeadline>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::admin_of(&pool, &session, body.cohort_year).await?;
    let detail = deadline::create(&pool, &body).await?;
    log::info!(
        "{} deadline {} '{}' created by user {}",
        detail.deadline.deadline_type,
        detail.deadline.id,
        detail.deadline.name,
        me.user_id
    );
    Ok(HttpResponse::Created().json(detail))
}

/// The deadline with its sections and questions in order.
pub async fn read(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(deadline::get_detail(&pool, path.into_inner()).await?))
}

pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<DeadlineUpdate>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    require_admin_for(&pool, &session, id).await?;
    Ok(HttpResponse::Ok().json(deadline::update(&pool, id, &body).await?))
}

/// PUT /api/deadlines/{id}/questions: replaces every section and question.
/// Answers to the old questions are removed with them.
pub async fn replace_questions(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<QuestionsReplace>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = require_admin_for(&pool, &session, id).await?;
    let detail = deadline::replace_questions(&pool, id, &body.sections).await?;
    log::info!("Questions of deadline {id} replaced by user {}", me.user_id);
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = require_admin_for(&pool, &session, id).await?;
    deadline::delete(&pool, id).await?;
    log::info!("Deadline {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}
