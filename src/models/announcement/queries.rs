use sqlx::PgPool;

use super::types::*;
use crate::auth::validate;
use crate::errors::AppError;
use crate::models::common::Pagination;
use crate::models::thread::{self, Comment, CommentNode, NewComment};

/// `$1` is the reading user, for `is_read`.
const SELECT_ANNOUNCEMENT: &str = "\
    SELECT a.id, a.cohort_year, a.target_audience, a.title, a.content, a.author_id, \
           u.name AS author_name, a.created_at, a.updated_at, \
           EXISTS (SELECT 1 FROM announcement_read_logs l \
                   WHERE l.announcement_id = a.id AND l.user_id = $1) AS is_read \
    FROM announcements a \
    JOIN users u ON u.id = a.author_id";

const SELECT_COMMENT: &str = "\
    SELECT c.id, c.announcement_id AS thread_id, c.author_id, u.name AS author_name, \
           c.parent_comment_id, c.content, c.created_at \
    FROM announcement_comments c \
    JOIN users u ON u.id = c.author_id";

pub async fn create(pool: &PgPool, author_id: i64, new: &NewAnnouncement) -> Result<Announcement, AppError> {
    validate::finish(
        [
            validate::validate_required("title", &new.title, 200),
            validate::validate_required("content", &new.content, 20_000),
        ]
        .into_iter()
        .flatten()
        .collect(),
    )?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO announcements (cohort_year, target_audience, title, content, author_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(new.cohort_year)
    .bind(new.target_audience.as_str())
    .bind(new.title.trim())
    .bind(&new.content)
    .bind(author_id)
    .fetch_one(pool)
    .await?;
    get(pool, id, author_id).await
}

/// An announcement as seen by `user_id`.
pub async fn get(pool: &PgPool, id: i64, user_id: i64) -> Result<Announcement, AppError> {
    let sql = format!("{SELECT_ANNOUNCEMENT} WHERE a.id = $2");
    sqlx::query_as::<_, Announcement>(&sql)
        .bind(user_id)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Announcement", id))
}

/// Open an announcement: it is recorded as read by `user_id`.
pub async fn read(pool: &PgPool, id: i64, user_id: i64) -> Result<Announcement, AppError> {
    get(pool, id, user_id).await?;
    sqlx::query(
        "INSERT INTO announcement_read_logs (announcement_id, user_id) VALUES ($1, $2) \
         ON CONFLICT (announcement_id, user_id) DO NOTHING",
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;
    get(pool, id, user_id).await
}

/// Announcements of a cohort visible to `audiences` (every audience when `None`), newest first.
pub async fn find_for_user(
    pool: &PgPool,
    user_id: i64,
    cohort_year: i32,
    audiences: Option<&[Audience]>,
    pattern: Option<&str>,
    page: Pagination,
) -> Result<Vec<Announcement>, AppError> {
    let audiences: Option<Vec<&str>> = audiences.map(|a| a.iter().map(|x| x.as_str()).collect());
    let sql = format!(
        "{SELECT_ANNOUNCEMENT} \
         WHERE a.cohort_year = $2 \
           AND ($3::TEXT[] IS NULL OR a.target_audience = ANY($3)) \
           AND ($4::TEXT IS NULL OR a.title ILIKE $4) \
         ORDER BY a.created_at DESC, a.id DESC \
         LIMIT $5 OFFSET $6"
    );
    Ok(sqlx::query_as::<_, Announcement>(&sql)
        .bind(user_id)
        .bind(cohort_year)
        .bind(audiences)
        .bind(pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    user_id: i64,
    changes: &AnnouncementUpdate,
) -> Result<Announcement, AppError> {
    let result = sqlx::query(
        "UPDATE announcements SET \
             target_audience = COALESCE($2, target_audience), \
             title = COALESCE($3, title), \
             content = COALESCE($4, content), \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(changes.target_audience.map(|a| a.as_str()))
    .bind(changes.title.as_deref().map(str::trim))
    .bind(&changes.content)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Announcement", id));
    }
    get(pool, id, user_id).await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM announcements WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Announcement", id));
    }
    Ok(())
}

// --- Comments ---

pub async fn create_comment(
    pool: &PgPool,
    announcement_id: i64,
    author_id: i64,
    new: &NewComment,
) -> Result<Comment, AppError> {
    if let Some(e) = validate::validate_required("content", &new.content, 5_000) {
        return Err(AppError::Validation(vec![e]));
    }
    get(pool, announcement_id, author_id).await?;
    if let Some(parent_id) = new.parent_comment_id {
        let parent = get_comment(pool, parent_id).await?;
        if parent.thread_id != announcement_id {
            return Err(AppError::BadRequest(format!(
                "Comment {parent_id} belongs to another announcement"
            )));
        }
    }
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO announcement_comments (announcement_id, author_id, parent_comment_id, content) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(announcement_id)
    .bind(author_id)
    .bind(new.parent_comment_id)
    .bind(&new.content)
    .fetch_one(pool)
    .await?;
    get_comment(pool, id).await
}

pub async fn get_comment(pool: &PgPool, id: i64) -> Result<Comment, AppError> {
    let sql = format!("{SELECT_COMMENT} WHERE c.id = $1");
    sqlx::query_as::<_, Comment>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Comment", id))
}

pub async fn find_comments(pool: &PgPool, announcement_id: i64) -> Result<Vec<CommentNode>, AppError> {
    let sql = format!("{SELECT_COMMENT} WHERE c.announcement_id = $1");
    let comments = sqlx::query_as::<_, Comment>(&sql)
        .bind(announcement_id)
        .fetch_all(pool)
        .await?;
    Ok(thread::build_tree(comments))
}

/// Delete a comment together with its replies.
pub async fn delete_comment(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM announcement_comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Comment", id));
    }
    Ok(())
}
