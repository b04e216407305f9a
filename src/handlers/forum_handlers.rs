use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::errors::AppError;
use crate::models::forum::{self, ForumPostUpdate, ForumQuery, NewForumPost};
use crate::models::thread::NewComment;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/forum/posts", web::get().to(list))
        .route("/forum/posts", web::post().to(create))
        .route("/forum/posts/{id}", web::get().to(read))
        .route("/forum/posts/{id}", web::put().to(update))
        .route("/forum/posts/{id}", web::delete().to(delete))
        .route("/forum/posts/{id}/comments", web::post().to(create_comment))
        .route("/forum/comments/{id}", web::delete().to(delete_comment));
}

/// Authors edit their own posts and comments; administrators edit any.
fn require_author(me: &Principal, author_id: i64) -> Result<(), AppError> {
    if me.user_id == author_id || me.is_admin() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied("only the author or an administrator may change this".to_string()))
    }
}

/// GET /api/forum/posts?cohortYear=&category=&search=&page=&limit=
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<ForumQuery>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::load(&pool, &session, query.cohort_year).await?;
    Ok(HttpResponse::Ok().json(forum::find_all(&pool, &query, me.cohort_year).await?))
}

pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewForumPost>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::load(&pool, &session, body.cohort_year).await?;
    let post = forum::create(&pool, me.user_id, me.cohort_year, &body).await?;
    log::info!("Forum post {} in {} created by user {}", post.id, post.category, me.user_id);
    Ok(HttpResponse::Created().json(post))
}

/// The post with its comment tree.
pub async fn read(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(forum::get_detail(&pool, path.into_inner()).await?))
}

pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<ForumPostUpdate>,
) -> Result<HttpResponse, AppError> {
    let post = forum::get(&pool, path.into_inner()).await?;
    let me = Principal::load(&pool, &session, Some(post.cohort_year)).await?;
    require_author(&me, post.author_id)?;
    Ok(HttpResponse::Ok().json(forum::update(&pool, post.id, &body).await?))
}

pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let post = forum::get(&pool, path.into_inner()).await?;
    let me = Principal::load(&pool, &session, Some(post.cohort_year)).await?;
    require_author(&me, post.author_id)?;
    forum::delete(&pool, post.id).await?;
    log::info!("Forum post {} deleted by user {}", post.id, me.user_id);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn create_comment(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<NewComment>,
) -> Result<HttpResponse, AppError> {
    let user_id = crate::auth::session::require_user_id(&session)?;
    let comment = forum::create_comment(&pool, path.into_inner(), user_id, &body).await?;
    Ok(HttpResponse::Created().json(comment))
}

pub async fn delete_comment(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let comment = forum::get_comment(&pool, path.into_inner()).await?;
    let post = forum::get(&pool, comment.thread_id).await?;
    let me = Principal::load(&pool, &session, Some(post.cohort_year)).await?;
    require_author(&me, comment.author_id)?;
    forum::delete_comment(&pool, comment.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::{Role, administrator::Administrator};

    #[test]
    fn authors_and_admins_may_edit() {
        let author = Principal { user_id: 4, cohort_year: 2024, roles: vec![Role::None] };
        assert!(require_author(&author, 4).is_ok());
        assert!(matches!(require_author(&author, 5), Err(AppError::PermissionDenied(_))));

        let admin = Principal {
            user_id: 1,
            cohort_year: 2024,
            roles: vec![Role::Administrator(Administrator { id: 1, user_id: 1, cohort_year: 2024 })],
        };
        assert!(require_author(&admin, 5).is_ok());
    }
}
