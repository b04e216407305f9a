use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;
use crate::models::common::Pagination;
use crate::models::evaluation;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Adviser {
    pub id: i64,
    pub user_id: i64,
    pub cohort_year: i32,
    pub matriculation_no: Option<String>,
    pub nusnet_id: Option<String>,
}

/// Adviser record flattened with its user and the number of projects it advises.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdviserView {
    pub id: i64,
    pub user_id: i64,
    pub cohort_year: i32,
    pub matriculation_no: Option<String>,
    pub nusnet_id: Option<String>,
    pub name: String,
    pub email: String,
    pub project_count: i64,
}

const SELECT_ADVISER: &str =
    "SELECT id, user_id, cohort_year, matriculation_no, nusnet_id FROM advisers";

const SELECT_ADVISER_VIEW: &str = "\
    SELECT a.id, a.user_id, a.cohort_year, a.matriculation_no, a.nusnet_id, u.name, u.email, \
           (SELECT COUNT(*) FROM projects p WHERE p.adviser_id = a.id) AS project_count \
    FROM advisers a \
    JOIN users u ON u.id = a.user_id";

pub async fn create_in(
    conn: &mut PgConnection,
    user_id: i64,
    cohort_year: i32,
    matriculation_no: Option<&str>,
    nusnet_id: Option<&str>,
) -> Result<i64, AppError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO advisers (user_id, cohort_year, matriculation_no, nusnet_id) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(user_id)
    .bind(cohort_year)
    .bind(matriculation_no.map(str::trim))
    .bind(nusnet_id.map(str::trim))
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn find_record(pool: &PgPool, id: i64) -> Result<Option<Adviser>, AppError> {
    let sql = format!("{SELECT_ADVISER} WHERE id = $1");
    Ok(sqlx::query_as::<_, Adviser>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get_record(pool: &PgPool, id: i64) -> Result<Adviser, AppError> {
    find_record(pool, id).await?.ok_or_else(|| AppError::not_found("Adviser", id))
}

pub async fn find_by_user_and_cohort(
    pool: &PgPool,
    user_id: i64,
    cohort_year: i32,
) -> Result<Option<Adviser>, AppError> {
    let sql = format!("{SELECT_ADVISER} WHERE user_id = $1 AND cohort_year = $2");
    Ok(sqlx::query_as::<_, Adviser>(&sql)
        .bind(user_id)
        .bind(cohort_year)
        .fetch_optional(pool)
        .await?)
}

pub async fn get_view(pool: &PgPool, id: i64) -> Result<AdviserView, AppError> {
    let sql = format!("{SELECT_ADVISER_VIEW} WHERE a.id = $1");
    sqlx::query_as::<_, AdviserView>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Adviser", id))
}

/// Views for a batch of advisers. Unknown ids are skipped.
pub async fn find_views_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<AdviserView>, AppError> {
    let sql = format!("{SELECT_ADVISER_VIEW} WHERE a.id = ANY($1)");
    Ok(sqlx::query_as::<_, AdviserView>(&sql).bind(ids).fetch_all(pool).await?)
}

pub async fn find_all(
    pool: &PgPool,
    cohort_year: Option<i32>,
    pattern: Option<&str>,
    page: Pagination,
) -> Result<Vec<AdviserView>, AppError> {
    let sql = format!(
        "{SELECT_ADVISER_VIEW} \
         WHERE ($1::INTEGER IS NULL OR a.cohort_year = $1) \
           AND ($2::TEXT IS NULL OR u.name ILIKE $2 OR u.email ILIKE $2) \
         ORDER BY a.cohort_year DESC, u.name, a.id \
         LIMIT $3 OFFSET $4"
    );
    Ok(sqlx::query_as::<_, AdviserView>(&sql)
        .bind(cohort_year)
        .bind(pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

/// Remove an adviser: drop every evaluation relation touching its projects,
/// detach the projects, then delete the role record. One transaction.
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let removed = evaluation::delete_by_adviser_in(&mut tx, id).await?;
    sqlx::query("UPDATE projects SET adviser_id = NULL WHERE adviser_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM advisers WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Adviser", id));
    }
    tx.commit().await?;
    log::info!("Deleted adviser {id} and {removed} evaluation relation(s)");
    Ok(())
}
