//! Submissions: target shapes, required answers and answer replacement.

mod common;

use sqlx::PgPool;

use common::*;
use skylab::errors::AppError;
use skylab::models::submission::{self, Answer, NewSubmission, SubmissionUpdate};

fn milestone_submission(deadline_id: i64, project_id: i64, is_draft: bool, answers: Vec<Answer>) -> NewSubmission {
    NewSubmission {
        deadline_id,
        from_project_id: Some(project_id),
        from_user_id: None,
        to_project_id: None,
        to_user_id: None,
        is_draft,
        answers,
    }
}

fn answer(question_id: i64, text: &str) -> Answer {
    Answer { question_id, answer: text.to_string() }
}

#[sqlx::test]
async fn updating_answers_replaces_all_previous_ones(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let project_id = create_project(&pool, YEAR, "Alpha", None).await;
    let milestone = create_milestone(&pool, YEAR, "Milestone 1").await;
    let q = question_ids(&milestone);

    let created = submission::create(
        &pool,
        &milestone_submission(
            milestone.deadline.id,
            project_id,
            true,
            vec![answer(q[0], "github.com/a"), answer(q[1], "first notes")],
        ),
    )
    .await
    .unwrap();
    assert_eq!(created.answers.len(), 2);

    let updated = submission::update(
        &pool,
        created.submission.id,
        &SubmissionUpdate { is_draft: Some(false), answers: Some(vec![answer(q[0], "github.com/b")]) },
    )
    .await
    .unwrap();
    assert!(!updated.submission.is_draft);
    assert_eq!(updated.answers, vec![answer(q[0], "github.com/b")]);
    assert!(updated.submission.updated_at >= created.submission.updated_at);

    let stored = submission::find_answers(&pool, created.submission.id).await.unwrap();
    assert_eq!(stored, vec![answer(q[0], "github.com/b")]);
}

#[sqlx::test]
async fn final_submissions_need_required_answers(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let project_id = create_project(&pool, YEAR, "Alpha", None).await;
    let milestone = create_milestone(&pool, YEAR, "Milestone 1").await;
    let q = question_ids(&milestone);

    let missing = milestone_submission(milestone.deadline.id, project_id, false, vec![answer(q[1], "notes")]);
    assert!(matches!(submission::create(&pool, &missing).await, Err(AppError::Validation(_))));

    let draft = milestone_submission(milestone.deadline.id, project_id, true, vec![answer(q[1], "notes")]);
    assert!(submission::create(&pool, &draft).await.is_ok());
}

#[sqlx::test]
async fn target_must_match_deadline_type(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let a = create_project(&pool, YEAR, "Alpha", None).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    let milestone = create_milestone(&pool, YEAR, "Milestone 1").await;

    let mut wrong = milestone_submission(milestone.deadline.id, a, true, Vec::new());
    wrong.to_project_id = Some(b);
    assert!(matches!(submission::create(&pool, &wrong).await, Err(AppError::BadRequest(_))));
}

#[sqlx::test]
async fn one_final_submission_per_sender(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let project_id = create_project(&pool, YEAR, "Alpha", None).await;
    let milestone = create_milestone(&pool, YEAR, "Milestone 1").await;
    let q = question_ids(&milestone);
    let new = milestone_submission(milestone.deadline.id, project_id, false, vec![answer(q[0], "repo")]);

    submission::create(&pool, &new).await.unwrap();
    assert!(matches!(submission::create(&pool, &new).await, Err(AppError::Conflict(_))));

    let as_draft = NewSubmission { is_draft: true, ..new };
    assert!(submission::create(&pool, &as_draft).await.is_ok());
}
