use sqlx::PgPool;

use super::schema::ApplicationSchemaV1;
use super::types::*;
use crate::errors::AppError;
use crate::mailer::SharedMailer;
use crate::models::common::{Pagination, search_pattern};
use crate::models::deadline::{self, DeadlineType};
use crate::models::onboarding;
use crate::models::submission::{self, Target};

const APPLICATION_COLUMNS: &str = "\
    submission_id, cohort_year, schema_version, team_name, achievement, \
    student1_name, student1_email, student1_matriculation_no, student1_nusnet_id, \
    student2_name, student2_email, student2_matriculation_no, student2_nusnet_id, \
    status, created_at";

/// Record an application: the submission, its answers and the decoded
/// application row are written together.
pub async fn submit(pool: &PgPool, new: &NewApplication) -> Result<Application, AppError> {
    let (deadline, questions) = tokio::try_join!(
        deadline::get(pool, new.deadline_id),
        deadline::find_questions(pool, new.deadline_id),
    )?;
    if deadline.deadline_type != DeadlineType::Application {
        return Err(AppError::BadRequest(format!(
            "Deadline {} does not accept applications",
            deadline.id
        )));
    }
    let form = ApplicationSchemaV1::decode(&new.answers)?;
    submission::check_answers(&questions, &new.answers, false)?;

    let mut tx = pool.begin().await?;
    let submission_id =
        submission::create_in(&mut tx, deadline.id, Target::default(), false, &new.answers).await?;
    let sql = format!(
        "INSERT INTO applications (submission_id, cohort_year, schema_version, team_name, achievement, \
             student1_name, student1_email, student1_matriculation_no, student1_nusnet_id, \
             student2_name, student2_email, student2_matriculation_no, student2_nusnet_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         RETURNING {APPLICATION_COLUMNS}"
    );
    let application = sqlx::query_as::<_, Application>(&sql)
        .bind(submission_id)
        .bind(deadline.cohort_year)
        .bind(ApplicationSchemaV1::VERSION)
        .bind(&form.team_name)
        .bind(form.achievement.as_str())
        .bind(&form.student1_name)
        .bind(&form.student1_email)
        .bind(&form.student1_matric)
        .bind(&form.student1_nusnet)
        .bind(&form.student2_name)
        .bind(&form.student2_email)
        .bind(&form.student2_matric)
        .bind(&form.student2_nusnet)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    log::info!(
        "Application {} received for team '{}' in cohort {}",
        application.submission_id,
        application.team_name,
        application.cohort_year
    );
    Ok(application)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Application>, AppError> {
    let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE submission_id = $1");
    Ok(sqlx::query_as::<_, Application>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Application, AppError> {
    find_by_id(pool, id).await?.ok_or_else(|| AppError::not_found("Application", id))
}

pub async fn get_detail(pool: &PgPool, id: i64) -> Result<ApplicationDetail, AppError> {
    let (application, submission) = tokio::try_join!(get(pool, id), submission::get_detail(pool, id))?;
    Ok(ApplicationDetail {
        application,
        deadline_id: submission.submission.deadline_id,
        answers: submission.answers,
    })
}

pub async fn find_all(pool: &PgPool, query: &ApplicationQuery) -> Result<Vec<Application>, AppError> {
    let page = Pagination::from_params(query.page, query.limit)?;
    let pattern = search_pattern(query.search.as_deref());
    let sql = format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications \
         WHERE ($1::INTEGER IS NULL OR cohort_year = $1) \
           AND ($2::TEXT IS NULL OR status = $2) \
           AND ($3::TEXT IS NULL OR team_name ILIKE $3) \
         ORDER BY created_at DESC, submission_id DESC \
         LIMIT $4 OFFSET $5"
    );
    Ok(sqlx::query_as::<_, Application>(&sql)
        .bind(query.cohort_year)
        .bind(query.status.map(|s| s.as_str()))
        .bind(pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?)
}

async fn set_status(pool: &PgPool, id: i64, status: ApplicationStatus) -> Result<Application, AppError> {
    let sql = format!(
        "UPDATE applications SET status = $2 WHERE submission_id = $1 RETURNING {APPLICATION_COLUMNS}"
    );
    Ok(sqlx::query_as::<_, Application>(&sql)
        .bind(id)
        .bind(status.as_str())
        .fetch_one(pool)
        .await?)
}

/// Turn the application into a project with two students. When any part of
/// the team cannot be created the status stays as it was.
pub async fn approve(pool: &PgPool, mailer: &SharedMailer, id: i64) -> Result<Application, AppError> {
    let application = get(pool, id).await?;
    let next = application.status.transition(ApplicationStatus::Approved)?;

    let outcome = onboarding::create_teams(pool, mailer, application.cohort_year, &[application.team()]).await;
    if !outcome.errors.is_empty() {
        return Err(AppError::BadRequest(outcome.errors.join("; ")));
    }
    let approved = set_status(pool, id, next).await?;
    log::info!("Application {id} approved as project '{}'", approved.team_name);
    Ok(approved)
}

pub async fn reject(pool: &PgPool, id: i64) -> Result<Application, AppError> {
    let application = get(pool, id).await?;
    let next = application.status.transition(ApplicationStatus::Rejected)?;
    let rejected = set_status(pool, id, next).await?;
    log::info!("Application {id} rejected");
    Ok(rejected)
}

/// Remove the application and then its submission.
pub async fn withdraw(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM applications WHERE submission_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Application", id));
    }
    submission::delete_in(&mut tx, id).await?;
    tx.commit().await?;
    log::info!("Application {id} withdrawn");
    Ok(())
}
