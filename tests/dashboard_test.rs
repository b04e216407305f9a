//! Dashboards: which deadlines each actor sees and how submissions are classified.

mod common;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use common::*;
use skylab::errors::AppError;
use skylab::models::common::ListQuery;
use skylab::models::dashboard::{self, DashboardQuery, SubmissionStatus};
use skylab::models::deadline::{DeadlineDetail, DeadlineType};
use skylab::models::evaluation;
use skylab::models::project::{self, ProjectUpdate};
use skylab::models::role::{adviser, mentor};
use skylab::models::submission::{self, Answer, NewSubmission};

fn due() -> DateTime<Utc> {
    at(2030, 6, 1)
}

async fn deadline(pool: &PgPool, name: &str, deadline_type: DeadlineType, milestone: Option<i64>) -> DeadlineDetail {
    create_deadline(pool, YEAR, name, deadline_type, due(), milestone, vec![short_question("Comments", true)]).await
}

fn answers(detail: &DeadlineDetail) -> Vec<Answer> {
    question_ids(detail)
        .into_iter()
        .map(|question_id| Answer { question_id, answer: "done".to_string() })
        .collect()
}

async fn submit(pool: &PgPool, detail: &DeadlineDetail, new: NewSubmission) -> i64 {
    let new = NewSubmission { deadline_id: detail.deadline.id, answers: answers(detail), ..new };
    submission::create(pool, &new).await.unwrap().submission.id
}

fn from_project(project_id: i64, is_draft: bool) -> NewSubmission {
    NewSubmission {
        deadline_id: 0,
        from_project_id: Some(project_id),
        from_user_id: None,
        to_project_id: None,
        to_user_id: None,
        is_draft,
        answers: Vec::new(),
    }
}

#[sqlx::test]
async fn student_without_project_is_rejected(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let student_id = create_student(&pool, YEAR, None, 1).await;
    let result = dashboard::student_deadlines(&pool, student_id, DashboardQuery::default()).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[sqlx::test]
async fn milestone_status_follows_last_update(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let project_id = create_project(&pool, YEAR, "Alpha", None).await;
    let student_id = create_student(&pool, YEAR, Some(project_id), 1).await;
    let milestone = deadline(&pool, "Milestone 1", DeadlineType::Milestone, None).await;

    let entries = dashboard::student_deadlines(&pool, student_id, DashboardQuery::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, SubmissionStatus::Unsubmitted);

    let draft = submit(&pool, &milestone, from_project(project_id, true)).await;
    let entries = dashboard::student_deadlines(&pool, student_id, DashboardQuery::default()).await.unwrap();
    assert_eq!(entries[0].submission.as_ref().map(|s| s.id), Some(draft));
    assert_eq!(entries[0].status, SubmissionStatus::Unsubmitted);

    let id = submit(&pool, &milestone, from_project(project_id, false)).await;
    set_updated_at(&pool, id, due()).await;
    let on_time = dashboard::student_deadlines(&pool, student_id, DashboardQuery::default()).await.unwrap();
    assert_eq!(on_time[0].submission.as_ref().map(|s| s.id), Some(id));
    assert_eq!(on_time[0].status, SubmissionStatus::Submitted);

    set_updated_at(&pool, id, due() + Duration::seconds(1)).await;
    let late = dashboard::student_deadlines(&pool, student_id, DashboardQuery::default()).await.unwrap();
    assert_eq!(late[0].status, SubmissionStatus::SubmittedLate);
    let again = dashboard::student_deadlines(&pool, student_id, DashboardQuery::default()).await.unwrap();
    assert_eq!(late, again);
}

#[sqlx::test]
async fn student_sees_evaluations_and_adviser_feedback(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let adviser_id = create_adviser(&pool, YEAR, "adviser@u.nus.edu").await;
    let a = create_project(&pool, YEAR, "Alpha", Some(adviser_id)).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    let student_id = create_student(&pool, YEAR, Some(a), 1).await;
    evaluation::create(&pool, a, b).await.unwrap();

    let milestone = deadline(&pool, "Milestone 1", DeadlineType::Milestone, None).await;
    deadline(&pool, "Evaluation 1", DeadlineType::Evaluation, Some(milestone.deadline.id)).await;
    deadline(&pool, "Feedback 1", DeadlineType::Feedback, None).await;
    deadline(&pool, "Application", DeadlineType::Application, None).await;

    let entries = dashboard::student_deadlines(&pool, student_id, DashboardQuery::default()).await.unwrap();
    let mut types: Vec<DeadlineType> = entries.iter().map(|e| e.deadline.deadline_type).collect();
    types.sort_by_key(|t| t.as_str());
    assert_eq!(types, vec![DeadlineType::Evaluation, DeadlineType::Feedback, DeadlineType::Milestone]);

    let adviser_user = adviser::get_record(&pool, adviser_id).await.unwrap().user_id;
    let feedback = entries.iter().find(|e| e.deadline.deadline_type == DeadlineType::Feedback).unwrap();
    assert_eq!(feedback.to_user.as_ref().map(|u| u.id), Some(adviser_user));

    let only_evaluations = dashboard::student_deadlines(
        &pool,
        student_id,
        DashboardQuery { deadline_type: Some(DeadlineType::Evaluation) },
    )
    .await
    .unwrap();
    assert_eq!(only_evaluations.len(), 1);
    assert_eq!(only_evaluations[0].to_project.as_ref().map(|p| p.id), Some(b));
}

#[sqlx::test]
async fn adviser_evaluations_show_the_milestone_being_evaluated(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let adviser_id = create_adviser(&pool, YEAR, "adviser@u.nus.edu").await;
    let idle_adviser = create_adviser(&pool, YEAR, "idle@u.nus.edu").await;
    let a = create_project(&pool, YEAR, "Alpha", Some(adviser_id)).await;
    let b = create_project(&pool, YEAR, "Beta", Some(adviser_id)).await;
    let milestone = deadline(&pool, "Milestone 1", DeadlineType::Milestone, None).await;
    let eval = deadline(&pool, "Evaluation 1", DeadlineType::Evaluation, Some(milestone.deadline.id)).await;
    submit(&pool, &milestone, from_project(a, false)).await;

    let adviser_user = adviser::get_record(&pool, adviser_id).await.unwrap().user_id;
    let own = NewSubmission {
        from_project_id: None,
        from_user_id: Some(adviser_user),
        to_project_id: Some(b),
        ..from_project(b, false)
    };
    submit(&pool, &eval, own).await;

    let entries = dashboard::adviser_deadlines(&pool, adviser_id, DashboardQuery::default()).await.unwrap();
    assert_eq!(entries.len(), 2);
    let for_project = |id: i64| entries.iter().find(|e| e.project.as_ref().map(|p| p.id) == Some(id)).unwrap();

    let alpha = for_project(a);
    assert_eq!(alpha.status, SubmissionStatus::Unsubmitted);
    assert_eq!(alpha.milestone.as_ref().map(|m| m.status), Some(SubmissionStatus::Submitted));
    let beta = for_project(b);
    assert_eq!(beta.status, SubmissionStatus::Submitted);
    assert_eq!(beta.milestone.as_ref().map(|m| m.status), Some(SubmissionStatus::Unsubmitted));

    let none = dashboard::adviser_deadlines(&pool, idle_adviser, DashboardQuery::default()).await;
    assert!(matches!(none, Err(AppError::BadRequest(_))));
}

async fn create_mentor(pool: &PgPool, email: &str) -> i64 {
    let user_id = create_user(pool, email).await;
    let mut conn = pool.acquire().await.unwrap();
    mentor::create_in(&mut conn, user_id, YEAR).await.unwrap()
}

#[sqlx::test]
async fn mentor_sees_final_milestone_submissions_of_mentored_projects(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let mentor_id = create_mentor(&pool, "mentor@u.nus.edu").await;
    let a = create_project(&pool, YEAR, "Alpha", None).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    let other = create_project(&pool, YEAR, "Gamma", None).await;
    for id in [a, b] {
        let changes = ProjectUpdate { mentor_id: Some(Some(mentor_id)), ..Default::default() };
        project::update(&pool, id, &changes).await.unwrap();
    }

    let milestone = deadline(&pool, "Milestone 1", DeadlineType::Milestone, None).await;
    deadline(&pool, "Evaluation 1", DeadlineType::Evaluation, Some(milestone.deadline.id)).await;
    deadline(&pool, "Feedback 1", DeadlineType::Feedback, None).await;
    let final_a = submit(&pool, &milestone, from_project(a, false)).await;
    submit(&pool, &milestone, from_project(b, true)).await;
    submit(&pool, &milestone, from_project(other, false)).await;

    let entries = dashboard::mentor_deadlines(&pool, mentor_id, DashboardQuery::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].deadline.id, milestone.deadline.id);
    let rows: Vec<(i64, Option<i64>, SubmissionStatus)> = entries[0]
        .projects
        .iter()
        .map(|p| (p.project.id, p.submission.as_ref().map(|s| s.id), p.status))
        .collect();
    assert_eq!(
        rows,
        vec![(a, Some(final_a), SubmissionStatus::Submitted), (b, None, SubmissionStatus::Unsubmitted)]
    );

    let evaluations = dashboard::mentor_deadlines(
        &pool,
        mentor_id,
        DashboardQuery { deadline_type: Some(DeadlineType::Evaluation) },
    )
    .await
    .unwrap();
    assert!(evaluations.is_empty());
}

#[sqlx::test]
async fn mentor_without_projects_or_record_is_rejected(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let idle = create_mentor(&pool, "idle@u.nus.edu").await;
    let result = dashboard::mentor_deadlines(&pool, idle, DashboardQuery::default()).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let missing = dashboard::mentor_deadlines(&pool, idle + 1000, DashboardQuery::default()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[sqlx::test]
async fn admin_dashboard_lists_every_project_of_the_cohort(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    create_cohort(&pool, OTHER_YEAR).await;
    let a = create_project(&pool, YEAR, "Alpha", None).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    create_project(&pool, OTHER_YEAR, "Gamma", None).await;
    let milestone = deadline(&pool, "Milestone 1", DeadlineType::Milestone, None).await;

    let id = submit(&pool, &milestone, from_project(a, false)).await;
    set_updated_at(&pool, id, due() + Duration::days(1)).await;
    submit(&pool, &milestone, from_project(b, true)).await;

    let board = dashboard::admin_dashboard(&pool, milestone.deadline.id, &ListQuery::default()).await.unwrap();
    let statuses: Vec<(i64, SubmissionStatus)> = board.projects.iter().map(|p| (p.project.id, p.status)).collect();
    assert_eq!(statuses, vec![(a, SubmissionStatus::SubmittedLate), (b, SubmissionStatus::Unsubmitted)]);

    let searched = dashboard::admin_dashboard(
        &pool,
        milestone.deadline.id,
        &ListQuery { search: Some("bet".into()), ..Default::default() },
    )
    .await
    .unwrap();
    assert_eq!(searched.projects.len(), 1);
    assert_eq!(searched.projects[0].project.id, b);
}
