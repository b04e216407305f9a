use sqlx::PgPool;

use super::types::*;
use crate::auth::validate;
use crate::errors::AppError;
use crate::models::common::{Pagination, search_pattern};
use crate::models::thread::{self, Comment, NewComment};

const SELECT_POST: &str = "\
    SELECT p.id, p.cohort_year, p.author_id, u.name AS author_name, p.category, p.title, p.content, \
           (SELECT COUNT(*) FROM forum_comments c WHERE c.post_id = p.id) AS comment_count, \
           p.created_at, p.updated_at \
    FROM forum_posts p \
    JOIN users u ON u.id = p.author_id";

const SELECT_COMMENT: &str = "\
    SELECT c.id, c.post_id AS thread_id, c.author_id, u.name AS author_name, \
           c.parent_comment_id, c.content, c.created_at \
    FROM forum_comments c \
    JOIN users u ON u.id = c.author_id";

fn check_post_fields(title: Option<&str>, content: Option<&str>) -> Result<(), AppError> {
    let errors = [
        title.and_then(|t| validate::validate_required("title", t, 200)),
        content.and_then(|c| validate::validate_required("content", c, 20_000)),
    ]
    .into_iter()
    .flatten()
    .collect();
    validate::finish(errors)
}

pub async fn create(
    pool: &PgPool,
    author_id: i64,
    cohort_year: i32,
    new: &NewForumPost,
) -> Result<ForumPost, AppError> {
    check_post_fields(Some(&new.title), Some(&new.content))?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO forum_posts (cohort_year, author_id, category, title, content) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(cohort_year)
    .bind(author_id)
    .bind(new.category.as_str())
    .bind(new.title.trim())
    .bind(&new.content)
    .fetch_one(pool)
    .await?;
    get(pool, id).await
}

pub async fn get(pool: &PgPool, id: i64) -> Result<ForumPost, AppError> {
    let sql = format!("{SELECT_POST} WHERE p.id = $1");
    sqlx::query_as::<_, ForumPost>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Forum post", id))
}

pub async fn get_detail(pool: &PgPool, id: i64) -> Result<ForumPostDetail, AppError> {
    let sql = format!("{SELECT_COMMENT} WHERE c.post_id = $1");
    let comments_fut = sqlx::query_as::<_, Comment>(&sql).bind(id).fetch_all(pool);
    let (post, comments) =
        tokio::try_join!(get(pool, id), async { comments_fut.await.map_err(AppError::from) })?;
    Ok(ForumPostDetail { post, comments: thread::build_tree(comments) })
}

pub async fn find_all(pool: &PgPool, query: &ForumQuery, cohort_year: i32) -> Result<Vec<ForumPost>, AppError> {
    let page = Pagination::from_params(query.page, query.limit)?;
    let pattern = search_pattern(query.search.as_deref());
    let sql = format!(
        "{SELECT_POST} \
         WHERE p.cohort_year = $1 \
           AND ($2::TEXT IS NULL OR p.category = $2) \
           AND ($3::TEXT IS NULL OR p.title ILIKE $3 OR p.content ILIKE $3) \
         ORDER BY p.created_at DESC, p.id DESC \
         LIMIT $4 OFFSET $5"
    );
    Ok(sqlx::query_as::<_, ForumPost>(&sql)
        .bind(cohort_year)
        .bind(query.category.map(|c| c.as_str()))
        .bind(pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn update(pool: &PgPool, id: i64, changes: &ForumPostUpdate) -> Result<ForumPost, AppError> {
    check_post_fields(changes.title.as_deref(), changes.content.as_deref())?;
    let result = sqlx::query(
        "UPDATE forum_posts SET \
             category = COALESCE($2, category), \
             title = COALESCE($3, title), \
             content = COALESCE($4, content), \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(changes.category.map(|c| c.as_str()))
    .bind(changes.title.as_deref().map(str::trim))
    .bind(&changes.content)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Forum post", id));
    }
    get(pool, id).await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM forum_posts WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Forum post", id));
    }
    Ok(())
}

// --- Comments ---

pub async fn create_comment(
    pool: &PgPool,
    post_id: i64,
    author_id: i64,
    new: &NewComment,
) -> Result<Comment, AppError> {
    if let Some(e) = validate::validate_required("content", &new.content, 5_000) {
        return Err(AppError::Validation(vec![e]));
    }
    get(pool, post_id).await?;
    if let Some(parent_id) = new.parent_comment_id {
        let parent = get_comment(pool, parent_id).await?;
        if parent.thread_id != post_id {
            return Err(AppError::BadRequest(format!("Comment {parent_id} belongs to another post")));
        }
    }
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO forum_comments (post_id, author_id, parent_comment_id, content) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(post_id)
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

/// Delete a comment together with its replies.
pub async fn delete_comment(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM forum_comments WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Comment", id));
    }
    Ok(())
}
