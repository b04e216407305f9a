use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;
use crate::models::common::Pagination;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub cohort_year: i32,
    pub project_id: Option<i64>,
    pub matriculation_no: String,
    pub nusnet_id: String,
}

/// Student record flattened together with its user's name and email.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub id: i64,
    pub user_id: i64,
    pub cohort_year: i32,
    pub project_id: Option<i64>,
    pub matriculation_no: String,
    pub nusnet_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentUpdate {
    pub matriculation_no: Option<String>,
    pub nusnet_id: Option<String>,
    pub project_id: Option<i64>,
}

const SELECT_STUDENT: &str =
    "SELECT id, user_id, cohort_year, project_id, matriculation_no, nusnet_id FROM students";

const SELECT_STUDENT_VIEW: &str = "\
    SELECT s.id, s.user_id, s.cohort_year, s.project_id, s.matriculation_no, s.nusnet_id, \
           u.name, u.email \
    FROM students s \
    JOIN users u ON u.id = s.user_id";

pub async fn create_in(
    conn: &mut PgConnection,
    user_id: i64,
    cohort_year: i32,
    project_id: Option<i64>,
    matriculation_no: &str,
    nusnet_id: &str,
) -> Result<i64, AppError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO students (user_id, cohort_year, project_id, matriculation_no, nusnet_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(user_id)
    .bind(cohort_year)
    .bind(project_id)
    .bind(matriculation_no.trim())
    .bind(nusnet_id.trim())
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn find_record(pool: &PgPool, id: i64) -> Result<Option<Student>, AppError> {
    let sql = format!("{SELECT_STUDENT} WHERE id = $1");
    Ok(sqlx::query_as::<_, Student>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get_record(pool: &PgPool, id: i64) -> Result<Student, AppError> {
    find_record(pool, id).await?.ok_or_else(|| AppError::not_found("Student", id))
}

pub async fn find_by_user_and_cohort(
    pool: &PgPool,
    user_id: i64,
    cohort_year: i32,
) -> Result<Option<Student>, AppError> {
    let sql = format!("{SELECT_STUDENT} WHERE user_id = $1 AND cohort_year = $2");
    Ok(sqlx::query_as::<_, Student>(&sql)
        .bind(user_id)
        .bind(cohort_year)
        .fetch_optional(pool)
        .await?)
}

pub async fn get_view(pool: &PgPool, id: i64) -> Result<StudentView, AppError> {
    let sql = format!("{SELECT_STUDENT_VIEW} WHERE s.id = $1");
    sqlx::query_as::<_, StudentView>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Student", id))
}

pub async fn find_all(
    pool: &PgPool,
    cohort_year: Option<i32>,
    pattern: Option<&str>,
    page: Pagination,
) -> Result<Vec<StudentView>, AppError> {
    let sql = format!(
        "{SELECT_STUDENT_VIEW} \
         WHERE ($1::INTEGER IS NULL OR s.cohort_year = $1) \
           AND ($2::TEXT IS NULL OR u.name ILIKE $2 OR u.email ILIKE $2 \
                OR s.matriculation_no ILIKE $2 OR s.nusnet_id ILIKE $2) \
         ORDER BY s.cohort_year DESC, u.name, s.id \
         LIMIT $3 OFFSET $4"
    );
    Ok(sqlx::query_as::<_, StudentView>(&sql)
        .bind(cohort_year)
        .bind(pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

pub async fn find_by_project(pool: &PgPool, project_id: i64) -> Result<Vec<StudentView>, AppError> {
    let sql = format!("{SELECT_STUDENT_VIEW} WHERE s.project_id = $1 ORDER BY u.name, s.id");
    Ok(sqlx::query_as::<_, StudentView>(&sql).bind(project_id).fetch_all(pool).await?)
}

pub async fn update(pool: &PgPool, id: i64, changes: &StudentUpdate) -> Result<StudentView, AppError> {
    let result = sqlx::query(
        "UPDATE students SET \
             matriculation_no = COALESCE($2, matriculation_no), \
             nusnet_id = COALESCE($3, nusnet_id), \
             project_id = COALESCE($4, project_id) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(changes.matriculation_no.as_deref().map(str::trim))
    .bind(changes.nusnet_id.as_deref().map(str::trim))
    .bind(changes.project_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Student", id));
    }
    get_view(pool, id).await
}

/// Point the given students at a project. Students outside `cohort_year` are left untouched
/// and reported as an error.
pub async fn assign_to_project(
    conn: &mut PgConnection,
    student_ids: &[i64],
    project_id: i64,
    cohort_year: i32,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE students SET project_id = $1 WHERE id = ANY($2) AND cohort_year = $3",
    )
    .bind(project_id)
    .bind(student_ids)
    .bind(cohort_year)
    .execute(conn)
    .await?;
    if result.rows_affected() as usize != student_ids.len() {
        return Err(AppError::BadRequest(format!(
            "Some students do not exist in cohort {cohort_year}"
        )));
    }
    Ok(())
}

/// Remove every student from a project.
pub async fn clear_project(conn: &mut PgConnection, project_id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE students SET project_id = NULL WHERE project_id = $1")
        .bind(project_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete the role record only; the user account stays.
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Student", id));
    }
    Ok(())
}
