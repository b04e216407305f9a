use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
    pub academic_year: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCohort {
    pub academic_year: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl NewCohort {
    /// A cohort spanning the calendar year of today, used when seeding an empty database.
    pub fn for_today() -> Self {
        let year = Utc::now().year();
        let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now);
        let end = Utc
            .with_ymd_and_hms(year, 12, 31, 23, 59, 59)
            .single()
            .unwrap_or_else(Utc::now);
        NewCohort { academic_year: year, start_date: start, end_date: end }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CohortUpdate {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

const SELECT_COHORT: &str = "SELECT academic_year, start_date, end_date FROM cohorts";

pub async fn create(pool: &PgPool, new: &NewCohort) -> Result<Cohort, AppError> {
    if new.start_date >= new.end_date {
        return Err(AppError::BadRequest("Cohort start date must be before its end date".to_string()));
    }
    let cohort = sqlx::query_as::<_, Cohort>(
        "INSERT INTO cohorts (academic_year, start_date, end_date) VALUES ($1, $2, $3) \
         RETURNING academic_year, start_date, end_date",
    )
    .bind(new.academic_year)
    .bind(new.start_date)
    .bind(new.end_date)
    .fetch_one(pool)
    .await?;
    Ok(cohort)
}

pub async fn find_all(pool: &PgPool) -> Result<Vec<Cohort>, AppError> {
    let sql = format!("{SELECT_COHORT} ORDER BY academic_year DESC");
    Ok(sqlx::query_as::<_, Cohort>(&sql).fetch_all(pool).await?)
}

pub async fn find_by_year(pool: &PgPool, academic_year: i32) -> Result<Option<Cohort>, AppError> {
    let sql = format!("{SELECT_COHORT} WHERE academic_year = $1");
    Ok(sqlx::query_as::<_, Cohort>(&sql).bind(academic_year).fetch_optional(pool).await?)
}

pub async fn get_by_year(pool: &PgPool, academic_year: i32) -> Result<Cohort, AppError> {
    find_by_year(pool, academic_year)
        .await?
        .ok_or_else(|| AppError::not_found("Cohort", academic_year))
}

/// The cohort whose date range contains now, else the latest academic year.
pub async fn find_current(pool: &PgPool) -> Result<Option<Cohort>, AppError> {
    let sql = format!(
        "{SELECT_COHORT} \
         ORDER BY (NOW() BETWEEN start_date AND end_date) DESC, academic_year DESC \
         LIMIT 1"
    );
    Ok(sqlx::query_as::<_, Cohort>(&sql).fetch_optional(pool).await?)
}

/// Resolve an explicit cohort year, defaulting to the current cohort.
pub async fn resolve_year(pool: &PgPool, academic_year: Option<i32>) -> Result<i32, AppError> {
    match academic_year {
        Some(year) => Ok(year),
        None => find_current(pool)
            .await?
            .map(|c| c.academic_year)
            .ok_or_else(|| AppError::BadRequest("No cohort has been created yet".to_string())),
    }
}

pub async fn update(pool: &PgPool, academic_year: i32, changes: &CohortUpdate) -> Result<Cohort, AppError> {
    let existing = get_by_year(pool, academic_year).await?;
    let start = changes.start_date.unwrap_or(existing.start_date);
    let end = changes.end_date.unwrap_or(existing.end_date);
    if start >= end {
        return Err(AppError::BadRequest("Cohort start date must be before its end date".to_string()));
    }
    let cohort = sqlx::query_as::<_, Cohort>(
        "UPDATE cohorts SET start_date = $2, end_date = $3 WHERE academic_year = $1 \
         RETURNING academic_year, start_date, end_date",
    )
    .bind(academic_year)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;
    Ok(cohort)
}

pub async fn delete(pool: &PgPool, academic_year: i32) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM cohorts WHERE academic_year = $1")
        .bind(academic_year)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Cohort", academic_year));
    }
    Ok(())
}
