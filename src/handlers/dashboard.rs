use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::errors::AppError;
use crate::models::common::ListQuery;
use crate::models::dashboard::{self, DashboardQuery};
use crate::models::deadline;
use crate::models::role::{adviser, mentor, student};

/// `?deadlineId=&search=&page=&limit=` for the administrator overview.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardQuery {
    pub deadline_id: i64,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard/students/{id}", web::get().to(student_view))
        .route("/dashboard/advisers/{id}", web::get().to(adviser_view))
        .route("/dashboard/mentors/{id}", web::get().to(mentor_view))
        .route("/dashboard/admin", web::get().to(admin_view));
}

/// The role record's own user, or an administrator of its cohort.
async fn require_owner(
    pool: &PgPool,
    session: &Session,
    owner_user_id: i64,
    cohort_year: i32,
) -> Result<(), AppError> {
    Principal::load(pool, session, Some(cohort_year)).await?.require_self_or_admin(owner_user_id)
}

pub async fn student_view(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
    let record = student::get_record(&pool, path.into_inner()).await?;
    require_owner(&pool, &session, record.user_id, record.cohort_year).await?;
    let entries = dashboard::student_deadlines(&pool, record.id, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn adviser_view(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
    let record = adviser::get_record(&pool, path.into_inner()).await?;
    require_owner(&pool, &session, record.user_id, record.cohort_year).await?;
    let entries = dashboard::adviser_deadlines(&pool, record.id, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn mentor_view(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
    let record = mentor::get_record(&pool, path.into_inner()).await?;
    require_owner(&pool, &session, record.user_id, record.cohort_year).await?;
    let entries = dashboard::mentor_deadlines(&pool, record.id, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// GET /api/dashboard/admin?deadlineId=: every project of the deadline's
/// cohort with its latest final submission.
pub async fn admin_view(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<AdminDashboardQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let target = deadline::get(&pool, query.deadline_id).await?;
    Principal::load(&pool, &session, Some(target.cohort_year)).await?.require_admin()?;
    let list = ListQuery {
        cohort_year: Some(target.cohort_year),
        search: query.search,
        page: query.page,
        limit: query.limit,
    };
    Ok(HttpResponse::Ok().json(dashboard::admin_dashboard(&pool, query.deadline_id, &list).await?))
}
