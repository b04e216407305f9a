use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::errors::AppError;
use crate::handlers::CountResponse;
use crate::models::evaluation::{self, NewRelation, NewRelationGroup, RelationFilter};
use crate::models::project;
use crate::models::role::adviser;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/relations", web::get().to(list))
        .route("/relations", web::post().to(create))
        .route("/relations/group", web::post().to(create_group))
        .route("/relations/adviser/{id}", web::get().to(list_by_adviser))
        .route("/relations/adviser/{id}", web::delete().to(delete_by_adviser))
        .route("/relations/project/{id}", web::delete().to(delete_by_project))
        .route("/relations/{id}", web::get().to(read))
        .route("/relations/{id}", web::delete().to(delete));
}

/// GET /api/relations?from=&to=
pub async fn list(pool: web::Data<PgPool>, filter: web::Query<RelationFilter>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(evaluation::find(&pool, filter.into_inner()).await?))
}

pub async fn read(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(evaluation::find_by_id(&pool, path.into_inner()).await?))
}

pub async fn list_by_adviser(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(evaluation::find_by_adviser(&pool, path.into_inner()).await?))
}

pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewRelation>,
) -> Result<HttpResponse, AppError> {
    let from = project::get(&pool, body.from).await?;
    let me = Principal::admin_of(&pool, &session, from.cohort_year).await?;
    let relation = evaluation::create(&pool, body.from, body.to).await?;
    log::info!("Relation {} ({} -> {}) created by user {}", relation.id, body.from, body.to, me.user_id);
    Ok(HttpResponse::Created().json(relation))
}

/// POST /api/relations/group: every project in the group evaluates every
/// other. Advisers may group their own projects.
pub async fn create_group(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewRelationGroup>,
) -> Result<HttpResponse, AppError> {
    let projects = project::find_by_ids(&pool, &body.project_ids).await?;
    let cohort_year = match projects.split_first() {
        Some((first, rest)) if rest.iter().all(|p| p.cohort_year == first.cohort_year) => first.cohort_year,
        Some(_) => return Err(AppError::BadRequest("Projects are not all in the same cohort".to_string())),
        None => return Err(AppError::BadRequest("A relation group needs at least two distinct projects".to_string())),
    };
    let me = Principal::load(&pool, &session, Some(cohort_year)).await?;
    if !me.is_admin() {
        let adviser = me
            .adviser()
            .ok_or_else(|| AppError::PermissionDenied("administrator or adviser role required".to_string()))?;
        if projects.iter().any(|p| p.adviser_id != Some(adviser.id)) {
            return Err(AppError::PermissionDenied(
                "advisers may only group projects they advise".to_string(),
            ));
        }
    }
    let created = evaluation::create_group(&pool, &body.project_ids).await?;
    log::info!("{} relations created in a group of {} projects", created.len(), body.project_ids.len());
    Ok(HttpResponse::Created().json(created))
}

pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = Principal::admin_of(&pool, &session, evaluation::cohort_year(&pool, id).await?).await?;
    let relation = evaluation::delete(&pool, id).await?;
    log::info!("Relation {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::Ok().json(relation))
}

/// DELETE /api/relations/project/{id}: both directions.
pub async fn delete_by_project(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let project = project::get(&pool, path.into_inner()).await?;
    Principal::admin_of(&pool, &session, project.cohort_year).await?;
    let count = evaluation::delete_by_project(&pool, project.id).await?;
    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

pub async fn delete_by_adviser(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let adviser = adviser::get_record(&pool, path.into_inner()).await?;
    Principal::admin_of(&pool, &session, adviser.cohort_year).await?;
    let count = evaluation::delete_by_adviser(&pool, adviser.id).await?;
    Ok(HttpResponse::Ok().json(CountResponse { count }))
}
