use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};

use super::types::{NewUser, ProfileUpdate, User, UserPage, UserProfile};
use crate::errors::AppError;
use crate::models::common::Pagination;

const SELECT_PROFILE: &str = "\
    SELECT id, email, name, profile_pic_url, github_url, linkedin_url, \
           personal_site_url, self_intro, created_at, updated_at \
    FROM users";

/// Find users with search (name or email) and pagination.
pub async fn find_paginated(
    pool: &PgPool,
    pattern: Option<&str>,
    page: Pagination,
) -> Result<UserPage, AppError> {
    let total_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR email ILIKE $1)",
    )
    .bind(pattern)
    .fetch_one(pool)
    .await?;

    let sql = format!(
        "{SELECT_PROFILE} WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR email ILIKE $1) \
         ORDER BY name, id LIMIT $2 OFFSET $3"
    );
    let users = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?;

    Ok(UserPage { users, total_count })
}

pub async fn find_profile_by_id(pool: &PgPool, id: i64) -> Result<Option<UserProfile>, AppError> {
    let sql = format!("{SELECT_PROFILE} WHERE id = $1");
    Ok(sqlx::query_as::<_, UserProfile>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get_profile(pool: &PgPool, id: i64) -> Result<UserProfile, AppError> {
    find_profile_by_id(pool, id).await?.ok_or_else(|| AppError::not_found("User", id))
}

/// Find user by email for authentication. Returns internal User with password hash.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, email, password, name FROM users WHERE LOWER(email) = LOWER($1)",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as::<_, User>("SELECT id, email, password, name FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn create(pool: &PgPool, new: &NewUser) -> Result<i64, AppError> {
    let mut conn = pool.acquire().await?;
    create_in(&mut conn, new).await
}

/// Insert a user on an existing connection, so callers can group it with a
/// role record inside one transaction.
pub async fn create_in(conn: &mut PgConnection, new: &NewUser) -> Result<i64, AppError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password, name) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(new.email.trim())
    .bind(&new.password)
    .bind(new.name.trim())
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Look up a user by email on a connection, creating one when absent.
/// Returns `(user_id, created)`.
pub async fn find_or_create_in(conn: &mut PgConnection, new: &NewUser) -> Result<(i64, bool), AppError> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(new.email.trim())
            .fetch_optional(&mut *conn)
            .await?;
    match existing {
        Some(id) => Ok((id, false)),
        None => Ok((create_in(conn, new).await?, true)),
    }
}

pub async fn update_profile(pool: &PgPool, id: i64, changes: &ProfileUpdate) -> Result<UserProfile, AppError> {
    let sql = "UPDATE users SET \
                   name = COALESCE($2, name), \
                   email = COALESCE($3, email), \
                   profile_pic_url = COALESCE($4, profile_pic_url), \
                   github_url = COALESCE($5, github_url), \
                   linkedin_url = COALESCE($6, linkedin_url), \
                   personal_site_url = COALESCE($7, personal_site_url), \
                   self_intro = COALESCE($8, self_intro), \
                   updated_at = NOW() \
               WHERE id = $1 \
               RETURNING id, email, name, profile_pic_url, github_url, linkedin_url, \
                         personal_site_url, self_intro, created_at, updated_at";
    sqlx::query_as::<_, UserProfile>(sql)
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.email.as_deref().map(str::trim))
        .bind(&changes.profile_pic_url)
        .bind(&changes.github_url)
        .bind(&changes.linkedin_url)
        .bind(&changes.personal_site_url)
        .bind(&changes.self_intro)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))
}

/// Update only the password hash for a user.
pub async fn update_password(pool: &PgPool, id: i64, password_hash: &str) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User", id));
    }
    Ok(())
}

/// Delete a user (cascades to role records, submissions, posts).
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User", id));
    }
    Ok(())
}

// --- Password reset tokens ---

/// How long a reset token stays valid.
pub const RESET_TOKEN_TTL_HOURS: i64 = 24;

/// Store (replacing any previous) the hashed reset token for a user.
pub async fn store_reset_token(pool: &PgPool, user_id: i64, token_hash: &str) -> Result<DateTime<Utc>, AppError> {
    let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
    sqlx::query(
        "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id) DO UPDATE SET token_hash = EXCLUDED.token_hash, expires_at = EXCLUDED.expires_at",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(expires_at)
}

/// The unexpired reset token hash for a user, if any.
pub async fn find_reset_token_hash(pool: &PgPool, user_id: i64) -> Result<Option<String>, AppError> {
    Ok(sqlx::query_scalar(
        "SELECT token_hash FROM password_reset_tokens WHERE user_id = $1 AND expires_at > NOW()",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn delete_reset_token(pool: &PgPool, user_id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
