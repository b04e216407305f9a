use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;
use crate::models::common::Pagination;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mentor {
    pub id: i64,
    pub user_id: i64,
    pub cohort_year: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MentorView {
    pub id: i64,
    pub user_id: i64,
    pub cohort_year: i32,
    pub name: String,
    pub email: String,
    pub project_count: i64,
}

const SELECT_MENTOR_VIEW: &str = "\
    SELECT m.id, m.user_id, m.cohort_year, u.name, u.email, \
           (SELECT COUNT(*) FROM projects p WHERE p.mentor_id = m.id) AS project_count \
    FROM mentors m \
    JOIN users u ON u.id = m.user_id";

pub async fn create_in(conn: &mut PgConnection, user_id: i64, cohort_year: i32) -> Result<i64, AppError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO mentors (user_id, cohort_year) VALUES ($1, $2) RETURNING id",
    )
    .bind(user_id)
    .bind(cohort_year)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn find_record(pool: &PgPool, id: i64) -> Result<Option<Mentor>, AppError> {
    Ok(sqlx::query_as::<_, Mentor>("SELECT id, user_id, cohort_year FROM mentors WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn get_record(pool: &PgPool, id: i64) -> Result<Mentor, AppError> {
    find_record(pool, id).await?.ok_or_else(|| AppError::not_found("Mentor", id))
}

pub async fn find_by_user_and_cohort(
    pool: &PgPool,
    user_id: i64,
    cohort_year: i32,
) -> Result<Option<Mentor>, AppError> {
    Ok(sqlx::query_as::<_, Mentor>(
        "SELECT id, user_id, cohort_year FROM mentors WHERE user_id = $1 AND cohort_year = $2",
    )
    .bind(user_id)
    .bind(cohort_year)
    .fetch_optional(pool)
    .await?)
}

pub async fn get_view(pool: &PgPool, id: i64) -> Result<MentorView, AppError> {
    let sql = format!("{SELECT_MENTOR_VIEW} WHERE m.id = $1");
    sqlx::query_as::<_, MentorView>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Mentor", id))
}

pub async fn find_all(
    pool: &PgPool,
    cohort_year: Option<i32>,
    pattern: Option<&str>,
    page: Pagination,
) -> Result<Vec<MentorView>, AppError> {
    let sql = format!(
        "{SELECT_MENTOR_VIEW} \
         WHERE ($1::INTEGER IS NULL OR m.cohort_year = $1) \
           AND ($2::TEXT IS NULL OR u.name ILIKE $2 OR u.email ILIKE $2) \
         ORDER BY m.cohort_year DESC, u.name, m.id \
         LIMIT $3 OFFSET $4"
    );
    Ok(sqlx::query_as::<_, MentorView>(&sql)
        .bind(cohort_year)
        .bind(pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

/// Delete the role record; mentored projects lose their mentor via `ON DELETE SET NULL`.
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM mentors WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Mentor", id));
    }
    Ok(())
}
