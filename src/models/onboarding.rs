//! Best-effort batch creation of student accounts and teams. Every row runs in
//! its own transaction, so one bad row never blocks the others.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::auth::{password, validate};
use crate::errors::AppError;
use crate::mailer::{self, SharedMailer};
use crate::models::project::{self, Achievement, NewProject};
use crate::models::role::student;
use crate::models::user::{self, NewUser};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentRow {
    pub name: String,
    pub email: String,
    pub matriculation_no: String,
    pub nusnet_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TeamRow {
    pub team_name: String,
    pub achievement: Achievement,
    pub students: Vec<StudentRow>,
    pub adviser_id: Option<i64>,
    pub mentor_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub created: usize,
    pub errors: Vec<String>,
}

impl BatchOutcome {
    fn record(&mut self, row: usize, label: &str, result: Result<(), AppError>) {
        match result {
            Ok(()) => self.created += 1,
            Err(AppError::Validation(fields)) => {
                let detail: Vec<String> = fields.iter().map(|f| f.message.clone()).collect();
                self.errors.push(format!("Row {row} ({label}): {}", detail.join(", ")));
            }
            Err(e) => self.errors.push(format!("Row {row} ({label}): {e}")),
        }
    }
}

fn check_student_row(row: &StudentRow) -> Result<(), AppError> {
    let errors = [
        validate::validate_required("name", &row.name, 200),
        validate::validate_email("email", &row.email),
        validate::validate_matriculation_no("matriculationNo", &row.matriculation_no),
        validate::validate_nusnet_id("nusnetId", &row.nusnet_id),
    ]
    .into_iter()
    .flatten()
    .collect();
    validate::finish(errors)
}

/// Reuse the account with this email or create one with a random password.
/// Returns the user id and whether the account is new.
async fn user_for_row(conn: &mut PgConnection, row: &StudentRow) -> Result<(i64, bool), AppError> {
    let hash = password::hash_password(&password::generate_secret(16)).map_err(AppError::Hash)?;
    let new = NewUser { email: row.email.clone(), password: hash, name: row.name.clone() };
    user::find_or_create_in(conn, &new).await
}

async fn create_student_row(
    pool: &PgPool,
    cohort_year: i32,
    row: &StudentRow,
) -> Result<bool, AppError> {
    check_student_row(row)?;
    let mut tx = pool.begin().await?;
    let (user_id, created) = user_for_row(&mut tx, row).await?;
    student::create_in(&mut tx, user_id, cohort_year, None, &row.matriculation_no, &row.nusnet_id).await?;
    tx.commit().await?;
    Ok(created)
}

/// Create a student record (and the account when missing) for every row.
pub async fn create_students(
    pool: &PgPool,
    mailer: &SharedMailer,
    cohort_year: i32,
    rows: &[StudentRow],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (i, row) in rows.iter().enumerate() {
        let result = create_student_row(pool, cohort_year, row).await.map(|created| {
            if created {
                mailer::spawn_send(mailer, mailer::account_created(&row.email, &row.name));
            }
        });
        outcome.record(i + 1, row.email.trim(), result);
    }
    log::info!(
        "Student onboarding for cohort {cohort_year}: {} created, {} failed",
        outcome.created,
        outcome.errors.len()
    );
    outcome
}

/// Returns the rows whose accounts were newly created.
async fn create_team_row<'a>(
    pool: &PgPool,
    cohort_year: i32,
    team: &'a TeamRow,
) -> Result<Vec<&'a StudentRow>, AppError> {
    if let Some(e) = validate::validate_required("teamName", &team.team_name, 200) {
        return Err(AppError::Validation(vec![e]));
    }
    for row in &team.students {
        check_student_row(row)?;
    }

    let mut tx = pool.begin().await?;
    let new_project = NewProject {
        name: team.team_name.clone(),
        cohort_year,
        achievement: Some(team.achievement),
        adviser_id: team.adviser_id,
        mentor_id: team.mentor_id,
        student_ids: Vec::new(),
        proposal_pdf_url: None,
    };
    let project_id = project::create_in(&mut tx, &new_project).await?;

    let mut new_accounts = Vec::new();
    for row in &team.students {
        let (user_id, created) = user_for_row(&mut tx, row).await?;
        student::create_in(
            &mut tx,
            user_id,
            cohort_year,
            Some(project_id),
            &row.matriculation_no,
            &row.nusnet_id,
        )
        .await?;
        if created {
            new_accounts.push(row);
        }
    }
    tx.commit().await?;
    Ok(new_accounts)
}

/// Create a project with its members for every team.
pub async fn create_teams(
    pool: &PgPool,
    mailer: &SharedMailer,
    cohort_year: i32,
    teams: &[TeamRow],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (i, team) in teams.iter().enumerate() {
        let result = create_team_row(pool, cohort_year, team).await.map(|new_accounts| {
            for row in new_accounts {
                mailer::spawn_send(mailer, mailer::account_created(&row.email, &row.name));
            }
        });
        outcome.record(i + 1, team.team_name.trim(), result);
    }
    log::info!(
        "Team onboarding for cohort {cohort_year}: {} created, {} failed",
        outcome.created,
        outcome.errors.len()
    );
    outcome
}
