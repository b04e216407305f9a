//! Batch onboarding keeps going past bad rows and only mails new accounts.

mod common;

use std::time::Duration;

use sqlx::PgPool;

use common::*;
use skylab::models::onboarding::{self, StudentRow, TeamRow};
use skylab::models::project::{self, Achievement};
use skylab::models::role::student;

fn row(n: u32, email: &str) -> StudentRow {
    StudentRow {
        name: format!("Student {n}"),
        email: email.to_string(),
        matriculation_no: format!("A{n:07}Y"),
        nusnet_id: format!("E{n:07}"),
    }
}

/// Mail goes out from spawned tasks.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[sqlx::test]
async fn one_bad_student_row_does_not_block_the_rest(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let (outbox, mailer) = memory_mailer();
    create_user(&pool, "existing@u.nus.edu").await;

    let rows = vec![
        row(1, "one@u.nus.edu"),
        row(2, "not-an-email"),
        row(3, "existing@u.nus.edu"),
    ];
    let outcome = onboarding::create_students(&pool, &mailer, YEAR, &rows).await;
    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.errors, vec!["Row 2 (not-an-email): 'not-an-email' is not a valid email"]);

    let students = student::find_all(&pool, Some(YEAR), None, Default::default()).await.unwrap();
    assert_eq!(students.len(), 2);

    settle().await;
    let sent: Vec<String> = outbox.sent().into_iter().map(|m| m.to).collect();
    assert_eq!(sent, vec!["one@u.nus.edu"]);

    let again = onboarding::create_students(&pool, &mailer, YEAR, &rows[..1]).await;
    assert_eq!(again.created, 0);
    assert_eq!(again.errors.len(), 1);
    assert!(again.errors[0].starts_with("Row 1 (one@u.nus.edu): "));
}

#[sqlx::test]
async fn teams_are_created_with_their_members(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let (outbox, mailer) = memory_mailer();
    let adviser_id = create_adviser(&pool, YEAR, "adviser@u.nus.edu").await;
    create_project(&pool, YEAR, "Taken", None).await;

    let teams = vec![
        TeamRow {
            team_name: "Rocket".into(),
            achievement: Achievement::Apollo,
            students: vec![row(1, "one@u.nus.edu"), row(2, "two@u.nus.edu")],
            adviser_id: Some(adviser_id),
            mentor_id: None,
        },
        TeamRow {
            team_name: "Taken".into(),
            achievement: Achievement::Vostok,
            students: vec![row(3, "three@u.nus.edu"), row(4, "four@u.nus.edu")],
            adviser_id: None,
            mentor_id: None,
        },
    ];
    let outcome = onboarding::create_teams(&pool, &mailer, YEAR, &teams).await;
    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].starts_with("Row 2 (Taken): "));

    let rocket = project::find_by_adviser(&pool, adviser_id).await.unwrap();
    assert_eq!(rocket.len(), 1);
    assert_eq!(rocket[0].achievement, Achievement::Apollo);
    let detail = project::get_detail(&pool, rocket[0].id).await.unwrap();
    assert_eq!(detail.students.len(), 2);

    // The failed team rolled back, so its members were never created.
    assert_eq!(student::find_all(&pool, Some(YEAR), None, Default::default()).await.unwrap().len(), 2);
    settle().await;
    assert_eq!(outbox.sent().len(), 2);
}
