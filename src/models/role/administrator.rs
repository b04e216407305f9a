use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Administrator {
    pub id: i64,
    pub user_id: i64,
    pub cohort_year: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdministratorView {
    pub id: i64,
    pub user_id: i64,
    pub cohort_year: i32,
    pub name: String,
    pub email: String,
}

pub async fn create(pool: &PgPool, user_id: i64, cohort_year: i32) -> Result<i64, AppError> {
    let mut conn = pool.acquire().await?;
    create_in(&mut conn, user_id, cohort_year).await
}

pub async fn create_in(conn: &mut PgConnection, user_id: i64, cohort_year: i32) -> Result<i64, AppError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO administrators (user_id, cohort_year) VALUES ($1, $2) RETURNING id",
    )
    .bind(user_id)
    .bind(cohort_year)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn find_by_user_and_cohort(
    pool: &PgPool,
    user_id: i64,
    cohort_year: i32,
) -> Result<Option<Administrator>, AppError> {
    Ok(sqlx::query_as::<_, Administrator>(
        "SELECT id, user_id, cohort_year FROM administrators WHERE user_id = $1 AND cohort_year = $2",
    )
    .bind(user_id)
    .bind(cohort_year)
    .fetch_optional(pool)
    .await?)
}

pub async fn get_record(pool: &PgPool, id: i64) -> Result<Administrator, AppError> {
    sqlx::query_as::<_, Administrator>("SELECT id, user_id, cohort_year FROM administrators WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Administrator", id))
}

pub async fn find_all(pool: &PgPool, cohort_year: Option<i32>) -> Result<Vec<AdministratorView>, AppError> {
    Ok(sqlx::query_as::<_, AdministratorView>(
        "SELECT a.id, a.user_id, a.cohort_year, u.name, u.email \
         FROM administrators a JOIN users u ON u.id = a.user_id \
         WHERE ($1::INTEGER IS NULL OR a.cohort_year = $1) \
         ORDER BY a.cohort_year DESC, u.name",
    )
    .bind(cohort_year)
    .fetch_all(pool)
    .await?)
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM administrators WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Administrator", id));
    }
    Ok(())
}
