use sqlx::{PgConnection, PgPool};

use super::types::*;
use crate::errors::AppError;
use crate::models::deadline;

const SELECT_SUBMISSION: &str = "\
    SELECT id, deadline_id, from_project_id, from_user_id, to_project_id, to_user_id, \
           is_draft, created_at, updated_at \
    FROM submissions";

async fn insert_answers(conn: &mut PgConnection, submission_id: i64, answers: &[Answer]) -> Result<(), AppError> {
    if answers.is_empty() {
        return Ok(());
    }
    let question_ids: Vec<i64> = answers.iter().map(|a| a.question_id).collect();
    let texts: Vec<&str> = answers.iter().map(|a| a.answer.as_str()).collect();
    sqlx::query(
        "INSERT INTO answers (submission_id, question_id, answer) \
         SELECT $1, q, a FROM UNNEST($2::BIGINT[], $3::TEXT[]) AS t(q, a)",
    )
    .bind(submission_id)
    .bind(&question_ids)
    .bind(&texts)
    .execute(conn)
    .await?;
    Ok(())
}

/// Insert a submission and its answers on an existing connection. The caller
/// has already checked the target and answers.
pub async fn create_in(
    conn: &mut PgConnection,
    deadline_id: i64,
    target: Target,
    is_draft: bool,
    answers: &[Answer],
) -> Result<i64, AppError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO submissions (deadline_id, from_project_id, from_user_id, to_project_id, to_user_id, is_draft) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(deadline_id)
    .bind(target.from_project_id)
    .bind(target.from_user_id)
    .bind(target.to_project_id)
    .bind(target.to_user_id)
    .bind(is_draft)
    .fetch_one(&mut *conn)
    .await?;
    insert_answers(conn, id, answers).await?;
    Ok(id)
}

pub async fn create(pool: &PgPool, new: &NewSubmission) -> Result<SubmissionDetail, AppError> {
    let (deadline, questions) = tokio::try_join!(
        deadline::get(pool, new.deadline_id),
        deadline::find_questions(pool, new.deadline_id),
    )?;
    let target = new.target();
    target.check(deadline.deadline_type)?;
    check_answers(&questions, &new.answers, new.is_draft)?;

    let mut tx = pool.begin().await?;
    let id = create_in(&mut tx, deadline.id, target, new.is_draft, &new.answers).await?;
    tx.commit().await?;
    get_detail(pool, id).await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Submission>, AppError> {
    let sql = format!("{SELECT_SUBMISSION} WHERE id = $1");
    Ok(sqlx::query_as::<_, Submission>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Submission, AppError> {
    find_by_id(pool, id).await?.ok_or_else(|| AppError::not_found("Submission", id))
}

pub async fn find_answers(pool: &PgPool, submission_id: i64) -> Result<Vec<Answer>, AppError> {
    Ok(sqlx::query_as::<_, Answer>(
        "SELECT question_id, answer FROM answers WHERE submission_id = $1 ORDER BY question_id",
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_detail(pool: &PgPool, id: i64) -> Result<SubmissionDetail, AppError> {
    let (submission, answers) = tokio::try_join!(get(pool, id), find_answers(pool, id))?;
    Ok(SubmissionDetail { submission, answers })
}

pub async fn find_all(pool: &PgPool, query: &SubmissionQuery) -> Result<Vec<Submission>, AppError> {
    let sql = format!(
        "{SELECT_SUBMISSION} \
         WHERE ($1::BIGINT IS NULL OR deadline_id = $1) \
           AND ($2::BIGINT IS NULL OR from_project_id = $2) \
           AND ($3::BIGINT IS NULL OR from_user_id = $3) \
         ORDER BY updated_at DESC, id DESC"
    );
    Ok(sqlx::query_as::<_, Submission>(&sql)
        .bind(query.deadline_id)
        .bind(query.from_project_id)
        .bind(query.from_user_id)
        .fetch_all(pool)
        .await?)
}

/// Every submission (drafts included) sent by a project.
pub async fn find_from_project(pool: &PgPool, project_id: i64) -> Result<Vec<Submission>, AppError> {
    find_all(pool, &SubmissionQuery { from_project_id: Some(project_id), ..Default::default() }).await
}

/// Every submission (drafts included) sent by a user.
pub async fn find_from_user(pool: &PgPool, user_id: i64) -> Result<Vec<Submission>, AppError> {
    find_all(pool, &SubmissionQuery { from_user_id: Some(user_id), ..Default::default() }).await
}

/// Every submission (drafts included) sent by any of `project_ids`.
pub async fn find_from_projects(pool: &PgPool, project_ids: &[i64]) -> Result<Vec<Submission>, AppError> {
    let sql = format!(
        "{SELECT_SUBMISSION} WHERE from_project_id = ANY($1) ORDER BY updated_at DESC, id DESC"
    );
    Ok(sqlx::query_as::<_, Submission>(&sql)
        .bind(project_ids)
        .fetch_all(pool)
        .await?)
}

/// Update the draft flag and/or replace the answers. Old answers are removed
/// before the new ones are written, in one transaction, and `updated_at` moves.
pub async fn update(pool: &PgPool, id: i64, changes: &SubmissionUpdate) -> Result<SubmissionDetail, AppError> {
    let existing = get(pool, id).await?;
    let is_draft = changes.is_draft.unwrap_or(existing.is_draft);
    let questions = deadline::find_questions(pool, existing.deadline_id).await?;
    let answers = match &changes.answers {
        Some(answers) => answers.clone(),
        None => find_answers(pool, id).await?,
    };
    check_answers(&questions, &answers, is_draft)?;

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE submissions SET is_draft = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(is_draft)
        .execute(&mut *tx)
        .await?;
    if let Some(answers) = &changes.answers {
        sqlx::query("DELETE FROM answers WHERE submission_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_answers(&mut tx, id, answers).await?;
    }
    tx.commit().await?;
    get_detail(pool, id).await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let mut conn = pool.acquire().await?;
    delete_in(&mut conn, id).await
}

pub async fn delete_in(conn: &mut PgConnection, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM submissions WHERE id = $1").bind(id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Submission", id));
    }
    Ok(())
}
