//! Demo fixtures for a fresh database: staff, teams, a milestone with its
//! evaluation and feedback deadlines, and peer-evaluation groups.

use chrono::{Duration, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use sqlx::PgPool;

use crate::auth::password;
use crate::errors::AppError;
use crate::models::deadline::{self, DeadlineType, NewDeadline, NewQuestion, NewSection, QuestionType};
use crate::models::project::{self, Achievement, NewProject};
use crate::models::role::{adviser, mentor, student};
use crate::models::user::{self, NewUser};
use crate::models::{cohort, evaluation};

const DEMO_PASSWORD: &str = "password123";
const TEAM_NAMES: [&str; 4] = ["Orbital Mechanics", "Lunar Lander", "Star Tracker", "Comet Chaser"];

/// `A` + seven digits + check letter.
fn random_matriculation_no(rng: &mut impl Rng) -> String {
    let digits: u32 = rng.random_range(0..10_000_000);
    let letter = char::from(b'A' + rng.random_range(0..26u8));
    format!("A{digits:07}{letter}")
}

fn random_nusnet_id(rng: &mut impl Rng) -> String {
    format!("E{:07}", rng.random_range(0..10_000_000u32))
}

fn question(text: &str, question_type: QuestionType, options: &[&str]) -> NewQuestion {
    NewQuestion {
        question: text.to_string(),
        description: String::new(),
        question_type,
        options: options.iter().map(|o| o.to_string()).collect(),
        is_required: true,
    }
}

/// Populate the current cohort with demo data. Skipped when the cohort
/// already has projects.
pub async fn seed_demo(pool: &PgPool) -> Result<(), AppError> {
    let cohort = match cohort::find_current(pool).await? {
        Some(c) => c,
        None => cohort::create(pool, &cohort::NewCohort::for_today()).await?,
    };
    let year = cohort.academic_year;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE cohort_year = $1")
        .bind(year)
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        log::info!("Cohort {year} already has {existing} project(s), skipping demo seed");
        return Ok(());
    }

    let hash = password::hash_password(DEMO_PASSWORD).map_err(AppError::Hash)?;
    let mut tx = pool.begin().await?;

    let adviser_user = user::create_in(
        &mut tx,
        &NewUser { email: format!("adviser.{year}@skylab.local"), password: hash.clone(), name: "Demo Adviser".into() },
    )
    .await?;
    let adviser_id = adviser::create_in(&mut tx, adviser_user, year, None, None).await?;
    let mentor_user = user::create_in(
        &mut tx,
        &NewUser { email: format!("mentor.{year}@skylab.local"), password: hash.clone(), name: "Demo Mentor".into() },
    )
    .await?;
    let mentor_id = mentor::create_in(&mut tx, mentor_user, year).await?;

    // ThreadRng is not Send, so draw everything before the inserts.
    let teams: Vec<(Achievement, [(String, String); 2])> = {
        let mut rng = rand::rng();
        TEAM_NAMES
            .iter()
            .map(|_| {
                let achievement = *Achievement::ALL.choose(&mut rng).unwrap_or(&Achievement::Vostok);
                let ids = [
                    (random_matriculation_no(&mut rng), random_nusnet_id(&mut rng)),
                    (random_matriculation_no(&mut rng), random_nusnet_id(&mut rng)),
                ];
                (achievement, ids)
            })
            .collect()
    };

    let mut project_ids = Vec::with_capacity(TEAM_NAMES.len());
    for (team, (name, (achievement, members))) in TEAM_NAMES.iter().zip(&teams).enumerate() {
        let project_id = project::create_in(
            &mut tx,
            &NewProject {
                name: name.to_string(),
                cohort_year: year,
                achievement: Some(*achievement),
                adviser_id: Some(adviser_id),
                mentor_id: Some(mentor_id),
                student_ids: Vec::new(),
                proposal_pdf_url: None,
            },
        )
        .await?;
        for (member, (matriculation_no, nusnet_id)) in members.iter().enumerate() {
            let user_id = user::create_in(
                &mut tx,
                &NewUser {
                    email: format!("student{}.{}.{year}@skylab.local", team + 1, member + 1),
                    password: hash.clone(),
                    name: format!("Student {}-{}", team + 1, member + 1),
                },
            )
            .await?;
            student::create_in(&mut tx, user_id, year, Some(project_id), matriculation_no, nusnet_id).await?;
        }
        project_ids.push(project_id);
    }
    tx.commit().await?;

    let now = Utc::now();
    let milestone = deadline::create(
        pool,
        &NewDeadline {
            cohort_year: year,
            name: "Milestone 1".into(),
            description: "Project poster and README".into(),
            due_by: now + Duration::days(14),
            deadline_type: DeadlineType::Milestone,
            evaluating_milestone_id: None,
            sections: vec![NewSection {
                name: "Submission".into(),
                description: String::new(),
                questions: vec![
                    question("Project README", QuestionType::Url, &[]),
                    question("Poster", QuestionType::Url, &[]),
                ],
            }],
        },
    )
    .await?;
    deadline::create(
        pool,
        &NewDeadline {
            cohort_year: year,
            name: "Evaluation 1".into(),
            description: "Peer evaluation of Milestone 1".into(),
            due_by: now + Duration::days(21),
            deadline_type: DeadlineType::Evaluation,
            evaluating_milestone_id: Some(milestone.deadline.id),
            sections: vec![NewSection {
                name: "Evaluation".into(),
                description: String::new(),
                questions: vec![
                    question("Overall rating", QuestionType::Dropdown, &["1", "2", "3", "4", "5"]),
                    question("Comments", QuestionType::Paragraph, &[]),
                ],
            }],
        },
    )
    .await?;
    deadline::create(
        pool,
        &NewDeadline {
            cohort_year: year,
            name: "Feedback 1".into(),
            description: "Feedback for your adviser".into(),
            due_by: now + Duration::days(28),
            deadline_type: DeadlineType::Feedback,
            evaluating_milestone_id: None,
            sections: vec![NewSection {
                name: "Feedback".into(),
                description: String::new(),
                questions: vec![question("How helpful was your adviser?", QuestionType::Paragraph, &[])],
            }],
        },
    )
    .await?;

    let relations = evaluation::create_group(pool, &project_ids).await?;
    log::info!(
        "Demo seed complete for cohort {year}: {} projects, {} relations (password '{DEMO_PASSWORD}')",
        project_ids.len(),
        relations.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validate;

    #[test]
    fn generated_ids_pass_validation() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            assert!(validate::validate_matriculation_no("m", &random_matriculation_no(&mut rng)).is_none());
            assert!(validate::validate_nusnet_id("n", &random_nusnet_id(&mut rng)).is_none());
        }
    }
}
