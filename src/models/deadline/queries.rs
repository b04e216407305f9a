use sqlx::{PgConnection, PgPool};

use super::types::*;
use crate::errors::{AppError, FieldError};
use crate::models::common::search_pattern;

const SELECT_DEADLINE: &str = "\
    SELECT id, cohort_year, name, description, due_by, type, evaluating_milestone_id \
    FROM deadlines";

const SELECT_QUESTION: &str = "\
    SELECT q.id, q.section_id, q.deadline_id, q.question_number, q.question, q.description, \
           q.type, q.options, q.is_required \
    FROM questions q \
    JOIN sections s ON s.id = q.section_id";

/// Evaluation deadlines must point at a Milestone of the same cohort; other
/// types must not point anywhere.
async fn check_evaluating_milestone(
    conn: &mut PgConnection,
    deadline_type: DeadlineType,
    milestone_id: Option<i64>,
    cohort_year: i32,
) -> Result<(), AppError> {
    match (deadline_type, milestone_id) {
        (DeadlineType::Evaluation, None) => Err(AppError::Validation(vec![FieldError::new(
            "evaluatingMilestoneId",
            "Evaluation deadlines must reference the milestone they evaluate",
        )])),
        (DeadlineType::Evaluation, Some(id)) => {
            let sql = format!("{SELECT_DEADLINE} WHERE id = $1");
            let milestone = sqlx::query_as::<_, Deadline>(&sql)
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| AppError::not_found("Deadline", id))?;
            if milestone.deadline_type != DeadlineType::Milestone || milestone.cohort_year != cohort_year {
                return Err(AppError::BadRequest(format!(
                    "Deadline {id} is not a milestone of cohort {cohort_year}"
                )));
            }
            Ok(())
        }
        (_, Some(_)) => Err(AppError::Validation(vec![FieldError::new(
            "evaluatingMilestoneId",
            "Only evaluation deadlines may reference a milestone",
        )])),
        (_, None) => Ok(()),
    }
}

fn validate_sections(sections: &[NewSection]) -> Result<(), AppError> {
    let mut errors = Vec::new();
    for (si, section) in sections.iter().enumerate() {
        if section.name.trim().is_empty() {
            errors.push(FieldError::new(&format!("sections[{si}].name"), "Section name is required"));
        }
        for (qi, q) in section.questions.iter().enumerate() {
            let field = format!("sections[{si}].questions[{qi}]");
            if q.question.trim().is_empty() {
                errors.push(FieldError::new(&field, "Question text is required"));
            }
            if q.question_type.needs_options() && q.options.is_empty() {
                errors.push(FieldError::new(
                    &field,
                    format!("{} questions need at least one option", q.question_type),
                ));
            }
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(AppError::Validation(errors)) }
}

async fn insert_sections(
    conn: &mut PgConnection,
    deadline_id: i64,
    sections: &[NewSection],
) -> Result<(), AppError> {
    for (si, section) in sections.iter().enumerate() {
        let section_id: i64 = sqlx::query_scalar(
            "INSERT INTO sections (deadline_id, section_number, name, description) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(deadline_id)
        .bind(si as i32 + 1)
        .bind(section.name.trim())
        .bind(&section.description)
        .fetch_one(&mut *conn)
        .await?;

        for (qi, q) in section.questions.iter().enumerate() {
            sqlx::query(
                "INSERT INTO questions (section_id, deadline_id, question_number, question, description, \
                                        type, options, is_required) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(section_id)
            .bind(deadline_id)
            .bind(qi as i32 + 1)
            .bind(q.question.trim())
            .bind(&q.description)
            .bind(q.question_type.as_str())
            .bind(&q.options)
            .bind(q.is_required)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

pub async fn create(pool: &PgPool, new: &NewDeadline) -> Result<DeadlineDetail, AppError> {
    if new.name.trim().is_empty() {
        return Err(AppError::Validation(vec![FieldError::new("name", "name is required")]));
    }
    validate_sections(&new.sections)?;

    let mut tx = pool.begin().await?;
    check_evaluating_milestone(&mut tx, new.deadline_type, new.evaluating_milestone_id, new.cohort_year)
        .await?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO deadlines (cohort_year, name, description, due_by, type, evaluating_milestone_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(new.cohort_year)
    .bind(new.name.trim())
    .bind(&new.description)
    .bind(new.due_by)
    .bind(new.deadline_type.as_str())
    .bind(new.evaluating_milestone_id)
    .fetch_one(&mut *tx)
    .await?;
    insert_sections(&mut tx, id, &new.sections).await?;
    tx.commit().await?;

    get_detail(pool, id).await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Deadline>, AppError> {
    let sql = format!("{SELECT_DEADLINE} WHERE id = $1");
    Ok(sqlx::query_as::<_, Deadline>(&sql).bind(id).fetch_optional(pool).await?)
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Deadline, AppError> {
    find_by_id(pool, id).await?.ok_or_else(|| AppError::not_found("Deadline", id))
}

/// Deadlines of a cohort restricted to `types` (all types when empty), ordered by due date.
pub async fn find_by_cohort(
    pool: &PgPool,
    cohort_year: i32,
    types: &[DeadlineType],
) -> Result<Vec<Deadline>, AppError> {
    let type_names: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
    let sql = format!(
        "{SELECT_DEADLINE} \
         WHERE cohort_year = $1 AND (CARDINALITY($2::TEXT[]) = 0 OR type = ANY($2)) \
         ORDER BY due_by, id"
    );
    Ok(sqlx::query_as::<_, Deadline>(&sql)
        .bind(cohort_year)
        .bind(&type_names)
        .fetch_all(pool)
        .await?)
}

pub async fn find_all(pool: &PgPool, query: &DeadlineQuery) -> Result<Vec<Deadline>, AppError> {
    let pattern = search_pattern(query.search.as_deref());
    let sql = format!(
        "{SELECT_DEADLINE} \
         WHERE ($1::INTEGER IS NULL OR cohort_year = $1) \
           AND ($2::TEXT IS NULL OR type = $2) \
           AND ($3::TEXT IS NULL OR name ILIKE $3) \
         ORDER BY cohort_year DESC, due_by, id"
    );
    Ok(sqlx::query_as::<_, Deadline>(&sql)
        .bind(query.cohort_year)
        .bind(query.deadline_type.map(|t| t.as_str()))
        .bind(pattern)
        .fetch_all(pool)
        .await?)
}

/// All questions of a deadline, in form order (section, then question number).
pub async fn find_questions(pool: &PgPool, deadline_id: i64) -> Result<Vec<Question>, AppError> {
    let sql = format!(
        "{SELECT_QUESTION} WHERE q.deadline_id = $1 ORDER BY s.section_number, q.question_number"
    );
    Ok(sqlx::query_as::<_, Question>(&sql).bind(deadline_id).fetch_all(pool).await?)
}

pub async fn get_detail(pool: &PgPool, id: i64) -> Result<DeadlineDetail, AppError> {
    let sections_fut = sqlx::query_as::<_, Section>(
        "SELECT id, deadline_id, section_number, name, description FROM sections \
         WHERE deadline_id = $1 ORDER BY section_number",
    )
    .bind(id)
    .fetch_all(pool);
    let (deadline, sections, mut questions) = tokio::try_join!(
        get(pool, id),
        async { sections_fut.await.map_err(AppError::from) },
        find_questions(pool, id),
    )?;

    let sections = sections
        .into_iter()
        .map(|section| {
            let (mine, rest): (Vec<Question>, Vec<Question>) =
                questions.drain(..).partition(|q| q.section_id == section.id);
            questions = rest;
            SectionDetail { section, questions: mine }
        })
        .collect();

    Ok(DeadlineDetail { deadline, sections })
}

pub async fn update(pool: &PgPool, id: i64, changes: &DeadlineUpdate) -> Result<Deadline, AppError> {
    let existing = get(pool, id).await?;
    let milestone_id = changes
        .evaluating_milestone_id
        .unwrap_or(existing.evaluating_milestone_id);

    let mut tx = pool.begin().await?;
    check_evaluating_milestone(&mut tx, existing.deadline_type, milestone_id, existing.cohort_year).await?;
    let sql = "UPDATE deadlines SET \
                   name = COALESCE($2, name), \
                   description = COALESCE($3, description), \
                   due_by = COALESCE($4, due_by), \
                   evaluating_milestone_id = $5, \
                   updated_at = NOW() \
               WHERE id = $1 \
               RETURNING id, cohort_year, name, description, due_by, type, evaluating_milestone_id";
    let deadline = sqlx::query_as::<_, Deadline>(sql)
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(&changes.description)
        .bind(changes.due_by)
        .bind(milestone_id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(deadline)
}

/// Replace the whole question form. Existing answers to the old questions are
/// removed with them.
pub async fn replace_questions(
    pool: &PgPool,
    id: i64,
    sections: &[NewSection],
) -> Result<DeadlineDetail, AppError> {
    validate_sections(sections)?;
    get(pool, id).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM sections WHERE deadline_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    insert_sections(&mut tx, id, sections).await?;
    sqlx::query("UPDATE deadlines SET updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    get_detail(pool, id).await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM deadlines WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Deadline", id));
    }
    Ok(())
}
