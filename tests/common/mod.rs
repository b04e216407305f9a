//! Shared fixtures for the database tests. Every test gets a fresh database
//! from `#[sqlx::test]` with the migrations applied.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::PgPool;

use skylab::auth::password;
use skylab::mailer::{MemoryMailer, SharedMailer};
use skylab::models::cohort::{self, NewCohort};
use skylab::models::deadline::{self, DeadlineDetail, DeadlineType, NewDeadline, NewQuestion, NewSection, QuestionType};
use skylab::models::project::{self, NewProject};
use skylab::models::role::{adviser, student};
use skylab::models::user::{self, NewUser};

pub const YEAR: i32 = 2024;
pub const OTHER_YEAR: i32 = 2025;
pub const PASSWORD: &str = "password123";

pub fn memory_mailer() -> (Arc<MemoryMailer>, SharedMailer) {
    let mailer = Arc::new(MemoryMailer::default());
    let shared: SharedMailer = mailer.clone();
    (mailer, shared)
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub async fn create_cohort(pool: &PgPool, year: i32) {
    cohort::create(
        pool,
        &NewCohort { academic_year: year, start_date: at(year, 1, 1), end_date: at(year, 12, 31) },
    )
    .await
    .unwrap();
}

pub async fn create_user(pool: &PgPool, email: &str) -> i64 {
    user::create(
        pool,
        &NewUser {
            email: email.to_string(),
            password: password::hash_password(PASSWORD).unwrap(),
            name: email.split('@').next().unwrap_or(email).to_string(),
        },
    )
    .await
    .unwrap()
}

/// Adviser record (and its user) in `year`. Returns the adviser id.
pub async fn create_adviser(pool: &PgPool, year: i32, email: &str) -> i64 {
    let user_id = create_user(pool, email).await;
    let mut conn = pool.acquire().await.unwrap();
    adviser::create_in(&mut conn, user_id, year, None, None).await.unwrap()
}

pub async fn create_project(pool: &PgPool, year: i32, name: &str, adviser_id: Option<i64>) -> i64 {
    project::create(
        pool,
        &NewProject {
            name: name.to_string(),
            cohort_year: year,
            achievement: None,
            adviser_id,
            mentor_id: None,
            student_ids: Vec::new(),
            proposal_pdf_url: None,
        },
    )
    .await
    .unwrap()
    .project
    .id
}

/// Student `n` of `year`, optionally in a project. Returns the student id.
pub async fn create_student(pool: &PgPool, year: i32, project_id: Option<i64>, n: u32) -> i64 {
    let user_id = create_user(pool, &format!("student{n}.{year}@u.nus.edu")).await;
    let mut conn = pool.acquire().await.unwrap();
    student::create_in(
        &mut conn,
        user_id,
        year,
        project_id,
        &format!("A{n:07}X"),
        &format!("E{n:07}"),
    )
    .await
    .unwrap()
}

pub fn short_question(text: &str, is_required: bool) -> NewQuestion {
    NewQuestion {
        question: text.to_string(),
        description: String::new(),
        question_type: QuestionType::ShortAnswer,
        options: Vec::new(),
        is_required,
    }
}

/// A deadline with one section holding `questions`.
pub async fn create_deadline(
    pool: &PgPool,
    year: i32,
    name: &str,
    deadline_type: DeadlineType,
    due_by: DateTime<Utc>,
    evaluating_milestone_id: Option<i64>,
    questions: Vec<NewQuestion>,
) -> DeadlineDetail {
    deadline::create(
        pool,
        &NewDeadline {
            cohort_year: year,
            name: name.to_string(),
            description: String::new(),
            due_by,
            deadline_type,
            evaluating_milestone_id,
            sections: vec![NewSection { name: "Main".into(), description: String::new(), questions }],
        },
    )
    .await
    .unwrap()
}

/// A milestone due a week from now with one required and one optional question.
pub async fn create_milestone(pool: &PgPool, year: i32, name: &str) -> DeadlineDetail {
    create_deadline(
        pool,
        year,
        name,
        DeadlineType::Milestone,
        Utc::now() + Duration::days(7),
        None,
        vec![short_question("Repository", true), short_question("Notes", false)],
    )
    .await
}

/// Question ids of a deadline in display order.
pub fn question_ids(detail: &DeadlineDetail) -> Vec<i64> {
    detail.sections.iter().flat_map(|s| s.questions.iter().map(|q| q.id)).collect()
}

/// Force a submission's `updated_at`, e.g. to sit exactly on a due date.
pub async fn set_updated_at(pool: &PgPool, submission_id: i64, when: DateTime<Utc>) {
    sqlx::query("UPDATE submissions SET updated_at = $2 WHERE id = $1")
        .bind(submission_id)
        .bind(when)
        .execute(pool)
        .await
        .unwrap();
}
