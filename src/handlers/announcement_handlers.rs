use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::auth::session::require_user_id;
use crate::errors::AppError;
use crate::models::announcement::{self, Announcement, AnnouncementUpdate, NewAnnouncement, audiences_for};
use crate::models::common::ListQuery;
use crate::models::thread::NewComment;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/announcements", web::get().to(list))
        .route("/announcements", web::post().to(create))
        .route("/announcements/comments/{id}", web::delete().to(delete_comment))
        .route("/announcements/{id}", web::get().to(read))
        .route("/announcements/{id}", web::put().to(update))
        .route("/announcements/{id}", web::delete().to(delete))
        .route("/announcements/{id}/comments", web::get().to(list_comments))
        .route("/announcements/{id}/comments", web::post().to(create_comment));
}

/// The announcement as the caller sees it, with the caller resolved in its cohort.
async fn load_visible(pool: &PgPool, session: &Session, id: i64) -> Result<(Principal, Announcement), AppError> {
    let found = announcement::get(pool, id, require_user_id(session)?).await?;
    let me = Principal::load(pool, session, Some(found.cohort_year)).await?;
    check_audience(&me, &found)?;
    Ok((me, found))
}

async fn require_admin_for(pool: &PgPool, session: &Session, id: i64) -> Result<Principal, AppError> {
    let found = announcement::get(pool, id, require_user_id(session)?).await?;
    Principal::admin_of(pool, session, found.cohort_year).await
}

fn check_audience(me: &Principal, a: &Announcement) -> Result<(), AppError> {
    match audiences_for(&me.roles) {
        Some(audiences) if !audiences.contains(&a.target_audience) => Err(AppError::PermissionDenied(
            format!("announcement {} is for {} only", a.id, a.target_audience),
        )),
        _ => Ok(()),
    }
}

/// GET /api/announcements: the caller's cohort, limited to audiences
/// matching the caller's roles there, each flagged read or unread.
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::load(&pool, &session, query.cohort_year).await?;
    let audiences = audiences_for(&me.roles);
    let announcements = announcement::find_for_user(
        &pool,
        me.user_id,
        me.cohort_year,
        audiences.as_deref(),
        query.pattern().as_deref(),
        query.pagination()?,
    )
    .await?;
    Ok(HttpResponse::Ok().json(announcements))
}

pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewAnnouncement>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::admin_of(&pool, &session, body.cohort_year).await?;
    let created = announcement::create(&pool, me.user_id, &body).await?;
    log::info!("Announcement {} for {} posted by user {}", created.id, created.target_audience, me.user_id);
    Ok(HttpResponse::Created().json(created))
}

/// Reading an announcement marks it read for the caller.
pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let (me, _) = load_visible(&pool, &session, id).await?;
    Ok(HttpResponse::Ok().json(announcement::read(&pool, id, me.user_id).await?))
}

pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<AnnouncementUpdate>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = require_admin_for(&pool, &session, id).await?;
    Ok(HttpResponse::Ok().json(announcement::update(&pool, id, me.user_id, &body).await?))
}

pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = require_admin_for(&pool, &session, id).await?;
    announcement::delete(&pool, id).await?;
    log::info!("Announcement {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_comments(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    load_visible(&pool, &session, id).await?;
    Ok(HttpResponse::Ok().json(announcement::find_comments(&pool, id).await?))
}

pub async fn create_comment(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<NewComment>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let (me, _) = load_visible(&pool, &session, id).await?;
    let comment = announcement::create_comment(&pool, id, me.user_id, &body).await?;
    Ok(HttpResponse::Created().json(comment))
}

/// DELETE /api/announcements/comments/{id}: the comment's author or an administrator.
pub async fn delete_comment(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let comment = announcement::get_comment(&pool, path.into_inner()).await?;
    let (me, _) = load_visible(&pool, &session, comment.thread_id).await?;
    me.require_self_or_admin(comment.author_id)?;
    announcement::delete_comment(&pool, comment.id).await?;
    Ok(HttpResponse::NoContent().finish())
}
