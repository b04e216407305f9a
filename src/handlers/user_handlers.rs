use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::auth::{password, validate};
use crate::errors::AppError;
use crate::handlers::PaginatedResponse;
use crate::models::common::ListQuery;
use crate::models::user::{self, ProfileUpdate};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PasswordChange {
    pub old_password: Option<String>,
    pub new_password: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/users", web::get().to(list))
        .route("/users/{id}", web::get().to(read))
        .route("/users/{id}", web::put().to(update))
        .route("/users/{id}", web::delete().to(delete))
        .route("/users/{id}/password", web::put().to(change_password));
}

/// GET /api/users?search=&page=&limit=. Accounts span cohorts, so
/// administrators of the current cohort manage them.
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    Principal::load(&pool, &session, None).await?.require_admin()?;
    let page = user::find_paginated(&pool, query.pattern().as_deref(), query.pagination()?).await?;
    Ok(HttpResponse::Ok().json(PaginatedResponse { items: page.users, total: page.total_count }))
}

pub async fn read(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(user::get_profile(&pool, path.into_inner()).await?))
}

/// PUT /api/users/{id}: own profile, or any profile for administrators.
pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    Principal::load(&pool, &session, None).await?.require_self_or_admin(id)?;

    let errors = [
        body.email.as_deref().and_then(|e| validate::validate_email("email", e)),
        body.name.as_deref().and_then(|n| validate::validate_required("name", n, 200)),
        validate::validate_optional("selfIntro", body.self_intro.as_deref(), 2_000),
    ]
    .into_iter()
    .flatten()
    .collect();
    validate::finish(errors)?;

    Ok(HttpResponse::Ok().json(user::update_profile(&pool, id, &body).await?))
}

/// PUT /api/users/{id}/password. Users must confirm their old password;
/// administrators resetting someone else's do not.
pub async fn change_password(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<PasswordChange>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = Principal::load(&pool, &session, None).await?;
    me.require_self_or_admin(id)?;
    if let Some(e) = validate::validate_password("newPassword", &body.new_password) {
        return Err(AppError::Validation(vec![e]));
    }

    if me.user_id == id {
        let current = user::find_by_id(&pool, id).await?.ok_or_else(|| AppError::not_found("User", id))?;
        let old = body.old_password.as_deref().unwrap_or("");
        if !password::verify_password(old, &current.password).map_err(AppError::Hash)? {
            return Err(AppError::BadRequest("Old password is incorrect".to_string()));
        }
    }

    let hash = password::hash_password(&body.new_password).map_err(AppError::Hash)?;
    user::update_password(&pool, id, &hash).await?;
    log::info!("Password changed for user {id} by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::load(&pool, &session, None).await?;
    me.require_admin()?;
    let id = path.into_inner();
    user::delete(&pool, id).await?;
    log::info!("User {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}
