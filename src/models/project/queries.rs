use sqlx::{PgConnection, PgPool};

use super::types::*;
use crate::errors::AppError;
use crate::models::common::Pagination;
use crate::models::evaluation;
use crate::models::role::{adviser, mentor, student};

const SELECT_PROJECT: &str = "\
    SELECT id, name, cohort_year, achievement, adviser_id, mentor_id, proposal_pdf_url, created_at \
    FROM projects";

/// Reject an adviser or mentor that belongs to another cohort.
async fn check_staff_cohort(
    conn: &mut PgConnection,
    adviser_id: Option<i64>,
    mentor_id: Option<i64>,
    cohort_year: i32,
) -> Result<(), AppError> {
    if let Some(id) = adviser_id {
        let year: Option<i32> = sqlx::query_scalar("SELECT cohort_year FROM advisers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        match year {
            None => return Err(AppError::not_found("Adviser", id)),
            Some(y) if y != cohort_year => {
                return Err(AppError::BadRequest(format!(
                    "Adviser {id} belongs to cohort {y}, not {cohort_year}"
                )));
            }
            Some(_) => {}
        }
    }
    if let Some(id) = mentor_id {
        let year: Option<i32> = sqlx::query_scalar("SELECT cohort_year FROM mentors WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        match year {
            None => return Err(AppError::not_found("Mentor", id)),
            Some(y) if y != cohort_year => {
                return Err(AppError::BadRequest(format!(
                    "Mentor {id} belongs to cohort {y}, not {cohort_year}"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Insert a project row on an existing connection. Members are assigned separately.
pub async fn create_in(conn: &mut PgConnection, new: &NewProject) -> Result<i64, AppError> {
    check_staff_cohort(conn, new.adviser_id, new.mentor_id, new.cohort_year).await?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO projects (name, cohort_year, achievement, adviser_id, mentor_id, proposal_pdf_url) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(new.name.trim())
    .bind(new.cohort_year)
    .bind(new.achievement.unwrap_or(Achievement::Vostok).as_str())
    .bind(new.adviser_id)
    .bind(new.mentor_id)
    .bind(&new.proposal_pdf_url)
    .fetch_one(&mut *conn)
    .await?;
    if !new.student_ids.is_empty() {
        student::assign_to_project(conn, &new.student_ids, id, new.cohort_year).await?;
    }
    Ok(id)
}

pub async fn create(pool: &PgPool, new: &NewProject) -> Result<ProjectDetail, AppError> {
    let mut tx = pool.begin().await?;
    let id = create_in(&mut tx, new).await?;
    tx.commit().await?;
    get_detail(pool, id).await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Project>, AppError> {
    let sql = format!("{SELECT_PROJECT} WHERE id = $1");
    Ok(sqlx::query_as::<_, Project>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Project, AppError> {
    find_by_id(pool, id).await?.ok_or_else(|| AppError::not_found("Project", id))
}

pub async fn get_detail(pool: &PgPool, id: i64) -> Result<ProjectDetail, AppError> {
    let project = get(pool, id).await?;
    let adviser_view = async {
        match project.adviser_id {
            Some(aid) => adviser::get_view(pool, aid).await.map(Some),
            None => Ok(None),
        }
    };
    let mentor_view = async {
        match project.mentor_id {
            Some(mid) => mentor::get_view(pool, mid).await.map(Some),
            None => Ok(None),
        }
    };
    let (students, adviser, mentor) =
        tokio::try_join!(student::find_by_project(pool, id), adviser_view, mentor_view)?;
    Ok(ProjectDetail { project, students, adviser, mentor })
}

pub async fn find_all(
    pool: &PgPool,
    cohort_year: Option<i32>,
    pattern: Option<&str>,
    achievement: Option<Achievement>,
    page: Pagination,
) -> Result<Vec<Project>, AppError> {
    let sql = format!(
        "{SELECT_PROJECT} \
         WHERE ($1::INTEGER IS NULL OR cohort_year = $1) \
           AND ($2::TEXT IS NULL OR name ILIKE $2) \
           AND ($3::TEXT IS NULL OR achievement = $3) \
         ORDER BY cohort_year DESC, name, id \
         LIMIT $4 OFFSET $5"
    );
    Ok(sqlx::query_as::<_, Project>(&sql)
        .bind(cohort_year)
        .bind(pattern)
        .bind(achievement.map(|a| a.as_str()))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

/// Projects with the given ids, in id order. Unknown ids are skipped.
pub async fn find_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Project>, AppError> {
    let sql = format!("{SELECT_PROJECT} WHERE id = ANY($1) ORDER BY id");
    Ok(sqlx::query_as::<_, Project>(&sql).bind(ids).fetch_all(pool).await?)
}

pub async fn find_by_adviser(pool: &PgPool, adviser_id: i64) -> Result<Vec<Project>, AppError> {
    let sql = format!("{SELECT_PROJECT} WHERE adviser_id = $1 ORDER BY name, id");
    Ok(sqlx::query_as::<_, Project>(&sql).bind(adviser_id).fetch_all(pool).await?)
}

pub async fn find_by_mentor(pool: &PgPool, mentor_id: i64) -> Result<Vec<Project>, AppError> {
    let sql = format!("{SELECT_PROJECT} WHERE mentor_id = $1 ORDER BY name, id");
    Ok(sqlx::query_as::<_, Project>(&sql).bind(mentor_id).fetch_all(pool).await?)
}

pub async fn update(pool: &PgPool, id: i64, changes: &ProjectUpdate) -> Result<ProjectDetail, AppError> {
    let existing = get(pool, id).await?;
    let adviser_id = changes.adviser_id.unwrap_or(existing.adviser_id);
    let mentor_id = changes.mentor_id.unwrap_or(existing.mentor_id);

    let mut tx = pool.begin().await?;
    check_staff_cohort(&mut tx, adviser_id, mentor_id, existing.cohort_year).await?;
    sqlx::query(
        "UPDATE projects SET \
             name = COALESCE($2, name), \
             achievement = COALESCE($3, achievement), \
             adviser_id = $4, \
             mentor_id = $5, \
             proposal_pdf_url = COALESCE($6, proposal_pdf_url) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(changes.name.as_deref().map(str::trim))
    .bind(changes.achievement.map(|a| a.as_str()))
    .bind(adviser_id)
    .bind(mentor_id)
    .bind(&changes.proposal_pdf_url)
    .execute(&mut *tx)
    .await?;
    if let Some(student_ids) = &changes.student_ids {
        student::clear_project(&mut tx, id).await?;
        if !student_ids.is_empty() {
            student::assign_to_project(&mut tx, student_ids, id, existing.cohort_year).await?;
        }
    }
    tx.commit().await?;
    get_detail(pool, id).await
}

/// Delete a project after removing every evaluation relation touching it.
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    evaluation::delete_by_project_in(&mut tx, id).await?;
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Project", id));
    }
    tx.commit().await?;
    Ok(())
}
