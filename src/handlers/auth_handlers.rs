use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::auth::{password, session, validate};
use crate::config::Config;
use crate::errors::AppError;
use crate::handlers::CohortParam;
use crate::mailer::{self, SharedMailer};
use crate::models::role::Role;
use crate::models::user::{self, UserProfile};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetConfirm {
    pub token: String,
    pub new_password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user: UserProfile,
    pub cohort_year: i32,
    pub roles: Vec<Role>,
}

async fn session_info(pool: &PgPool, session: &Session, cohort_year: Option<i32>) -> Result<SessionInfo, AppError> {
    let me = Principal::load(pool, session, cohort_year).await?;
    let user = user::get_profile(pool, me.user_id).await?;
    Ok(SessionInfo { user, cohort_year: me.cohort_year, roles: me.roles })
}

/// POST /api/auth/login
pub async fn login(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());
    let found = user::find_by_email(&pool, &body.email).await?.ok_or_else(invalid)?;
    if !password::verify_password(&body.password, &found.password).map_err(AppError::Hash)? {
        log::info!("Failed login for {}", body.email.trim());
        return Err(invalid());
    }

    session::sign_in(&session, found.id)?;
    log::info!("User {} logged in", found.id);
    Ok(HttpResponse::Ok().json(session_info(&pool, &session, None).await?))
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> HttpResponse {
    session::sign_out(&session);
    HttpResponse::NoContent().finish()
}

/// GET /api/auth/me
pub async fn me(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<CohortParam>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(session_info(&pool, &session, query.cohort_year).await?))
}

/// POST /api/auth/password-reset/request
///
/// Always answers 204 so the endpoint does not reveal which emails exist.
pub async fn request_reset(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    mailer: web::Data<SharedMailer>,
    body: web::Json<ResetRequest>,
) -> Result<HttpResponse, AppError> {
    if let Some(found) = user::find_by_email(&pool, &body.email).await? {
        let secret = password::generate_secret(32);
        let hash = password::hash_password(&secret).map_err(AppError::Hash)?;
        user::store_reset_token(&pool, found.id, &hash).await?;
        let token = format!("{}.{secret}", found.id);
        mailer::spawn_send(&mailer, mailer::password_reset(&found.email, &token, &config.frontend_url));
        log::info!("Password reset requested for user {}", found.id);
    }
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/auth/password-reset/confirm
pub async fn confirm_reset(
    pool: web::Data<PgPool>,
    body: web::Json<ResetConfirm>,
) -> Result<HttpResponse, AppError> {
    let invalid = || AppError::BadRequest("Reset token is invalid or has expired".to_string());
    let (user_id, secret) = body.token.split_once('.').ok_or_else(invalid)?;
    let user_id: i64 = user_id.parse().map_err(|_| invalid())?;

    if let Some(e) = validate::validate_password("newPassword", &body.new_password) {
        return Err(AppError::Validation(vec![e]));
    }
    let stored = user::find_reset_token_hash(&pool, user_id).await?.ok_or_else(invalid)?;
    if !password::verify_password(secret, &stored).map_err(AppError::Hash)? {
        return Err(invalid());
    }

    let hash = password::hash_password(&body.new_password).map_err(AppError::Hash)?;
    user::update_password(&pool, user_id, &hash).await?;
    user::delete_reset_token(&pool, user_id).await?;
    log::info!("Password reset completed for user {user_id}");
    Ok(HttpResponse::NoContent().finish())
}
