//! Per-actor deadline overviews: which deadlines concern a student, adviser,
//! mentor or administrator, and where each submission stands. Read only.

pub mod status;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

pub use status::{SubmissionStatus, classify, pick};

use crate::errors::AppError;
use crate::models::common::ListQuery;
use crate::models::deadline::{self, Deadline, DeadlineType};
use crate::models::evaluation;
use crate::models::project::{self, Project};
use crate::models::role::{adviser, mentor, student};
use crate::models::submission::{self, Submission};
use crate::models::user::UserSummary;

// ---------- Types ----------

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    #[serde(rename = "type")]
    pub deadline_type: Option<DeadlineType>,
}

/// A milestone as seen from an evaluation: the project's own submission to it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneStatus {
    pub deadline: Deadline,
    pub submission: Option<Submission>,
    pub status: SubmissionStatus,
}

/// One deadline the actor has to act on, with the submission that answers it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineEntry {
    pub deadline: Deadline,
    pub submission: Option<Submission>,
    pub status: SubmissionStatus,
    /// The project this entry is about, on adviser views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_project: Option<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<MilestoneStatus>,
}

impl DeadlineEntry {
    fn new(deadline: &Deadline, submission: Option<&Submission>) -> Self {
        DeadlineEntry {
            deadline: deadline.clone(),
            submission: submission.cloned(),
            status: classify(submission, deadline.due_by),
            project: None,
            to_project: None,
            to_user: None,
            milestone: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub project: Project,
    pub submission: Option<Submission>,
    pub status: SubmissionStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MentorDeadline {
    pub deadline: Deadline,
    pub projects: Vec<ProjectStatus>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub deadline: Deadline,
    pub projects: Vec<ProjectStatus>,
}

// ---------- Helpers ----------

/// The role's deadline types, narrowed to `filter` when given.
fn types_for(role_types: &[DeadlineType], filter: Option<DeadlineType>) -> Vec<DeadlineType> {
    match filter {
        Some(t) if role_types.contains(&t) => vec![t],
        Some(_) => Vec::new(),
        None => role_types.to_vec(),
    }
}

async fn cohort_deadlines(
    pool: &PgPool,
    cohort_year: i32,
    types: &[DeadlineType],
) -> Result<Vec<Deadline>, AppError> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    deadline::find_by_cohort(pool, cohort_year, types).await
}

// ---------- Queries ----------

/// Milestones, evaluations of every project the student's team evaluates, and
/// feedback for the team's adviser.
pub async fn student_deadlines(
    pool: &PgPool,
    student_id: i64,
    query: DashboardQuery,
) -> Result<Vec<DeadlineEntry>, AppError> {
    let student = student::get_record(pool, student_id).await?;
    let project_id = student
        .project_id
        .ok_or_else(|| AppError::BadRequest("Student does not have a project".to_string()))?;

    let types = types_for(
        &[DeadlineType::Milestone, DeadlineType::Evaluation, DeadlineType::Feedback],
        query.deadline_type,
    );
    let (project, deadlines, relations, submissions) = tokio::try_join!(
        project::get(pool, project_id),
        cohort_deadlines(pool, student.cohort_year, &types),
        evaluation::find_from_project(pool, project_id),
        submission::find_from_project(pool, project_id),
    )?;

    let to_ids: Vec<i64> = relations.iter().map(|r| r.to_project_id).collect();
    let adviser_view = async {
        match project.adviser_id {
            Some(id) => adviser::get_view(pool, id).await.map(Some),
            None => Ok(None),
        }
    };
    let (targets, adviser) = tokio::try_join!(project::find_by_ids(pool, &to_ids), adviser_view)?;
    let targets: HashMap<i64, Project> = targets.into_iter().map(|p| (p.id, p)).collect();
    let adviser_user = adviser.map(|a| UserSummary { id: a.user_id, name: a.name, email: a.email });

    let mut entries = Vec::new();
    for d in &deadlines {
        let mine = submissions.iter().filter(|s| s.deadline_id == d.id);
        match d.deadline_type {
            DeadlineType::Milestone => {
                let chosen = pick(mine.filter(|s| s.to_project_id.is_none() && s.to_user_id.is_none()));
                entries.push(DeadlineEntry::new(d, chosen));
            }
            DeadlineType::Evaluation => {
                for r in &relations {
                    let chosen = pick(
                        submissions
                            .iter()
                            .filter(|s| s.deadline_id == d.id && s.to_project_id == Some(r.to_project_id)),
                    );
                    let mut entry = DeadlineEntry::new(d, chosen);
                    entry.to_project = targets.get(&r.to_project_id).cloned();
                    entries.push(entry);
                }
            }
            DeadlineType::Feedback => {
                if let Some(user) = &adviser_user {
                    let chosen = pick(mine.filter(|s| s.to_user_id == Some(user.id)));
                    let mut entry = DeadlineEntry::new(d, chosen);
                    entry.to_user = Some(user.clone());
                    entries.push(entry);
                }
            }
            DeadlineType::Application => {}
        }
    }
    Ok(entries)
}

/// For each advised project: the adviser's own evaluation of it (next to the
/// milestone being evaluated) and the project's feedback about the adviser.
pub async fn adviser_deadlines(
    pool: &PgPool,
    adviser_id: i64,
    query: DashboardQuery,
) -> Result<Vec<DeadlineEntry>, AppError> {
    let adviser = adviser::get_record(pool, adviser_id).await?;
    let projects = project::find_by_adviser(pool, adviser_id).await?;
    if projects.is_empty() {
        return Err(AppError::BadRequest("Adviser does not have any projects".to_string()));
    }
    let project_ids: Vec<i64> = projects.iter().map(|p| p.id).collect();

    let types = types_for(&[DeadlineType::Evaluation, DeadlineType::Feedback], query.deadline_type);
    let (deadlines, milestones, own, from_projects) = tokio::try_join!(
        cohort_deadlines(pool, adviser.cohort_year, &types),
        deadline::find_by_cohort(pool, adviser.cohort_year, &[DeadlineType::Milestone]),
        submission::find_from_user(pool, adviser.user_id),
        submission::find_from_projects(pool, &project_ids),
    )?;
    let milestones: HashMap<i64, Deadline> = milestones.into_iter().map(|d| (d.id, d)).collect();

    let mut entries = Vec::new();
    for d in &deadlines {
        for p in &projects {
            let mut entry = match d.deadline_type {
                DeadlineType::Evaluation => {
                    let chosen = pick(
                        own.iter()
                            .filter(|s| s.deadline_id == d.id && s.to_project_id == Some(p.id)),
                    );
                    let mut entry = DeadlineEntry::new(d, chosen);
                    entry.milestone = d
                        .evaluating_milestone_id
                        .and_then(|mid| milestones.get(&mid))
                        .map(|m| {
                            let theirs = pick(from_projects.iter().filter(|s| {
                                s.deadline_id == m.id && s.from_project_id == Some(p.id)
                            }));
                            MilestoneStatus {
                                deadline: m.clone(),
                                submission: theirs.cloned(),
                                status: classify(theirs, m.due_by),
                            }
                        });
                    entry
                }
                DeadlineType::Feedback => {
                    let chosen = pick(from_projects.iter().filter(|s| {
                        s.deadline_id == d.id
                            && s.from_project_id == Some(p.id)
                            && s.to_user_id == Some(adviser.user_id)
                    }));
                    DeadlineEntry::new(d, chosen)
                }
                _ => continue,
            };
            entry.project = Some(p.clone());
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Milestones of the mentor's cohort, each with the final submissions of the
/// mentor's projects.
pub async fn mentor_deadlines(
    pool: &PgPool,
    mentor_id: i64,
    query: DashboardQuery,
) -> Result<Vec<MentorDeadline>, AppError> {
    let mentor = mentor::get_record(pool, mentor_id).await?;
    let projects = project::find_by_mentor(pool, mentor_id).await?;
    if projects.is_empty() {
        return Err(AppError::BadRequest("Mentor does not have any projects".to_string()));
    }
    let project_ids: Vec<i64> = projects.iter().map(|p| p.id).collect();

    let types = types_for(&[DeadlineType::Milestone], query.deadline_type);
    let (deadlines, submissions) = tokio::try_join!(
        cohort_deadlines(pool, mentor.cohort_year, &types),
        submission::find_from_projects(pool, &project_ids),
    )?;

    Ok(deadlines
        .into_iter()
        .map(|d| {
            let projects = projects
                .iter()
                .map(|p| {
                    let chosen = pick(submissions.iter().filter(|s| {
                        !s.is_draft && s.deadline_id == d.id && s.from_project_id == Some(p.id)
                    }));
                    ProjectStatus {
                        project: p.clone(),
                        submission: chosen.cloned(),
                        status: classify(chosen, d.due_by),
                    }
                })
                .collect();
            MentorDeadline { deadline: d, projects }
        })
        .collect())
}

/// Every project of the deadline's cohort with its latest final submission.
pub async fn admin_dashboard(
    pool: &PgPool,
    deadline_id: i64,
    query: &ListQuery,
) -> Result<AdminDashboard, AppError> {
    let page = query.pagination()?;
    let deadline = deadline::get(pool, deadline_id).await?;
    let pattern = query.pattern();
    let projects =
        project::find_all(pool, Some(deadline.cohort_year), pattern.as_deref(), None, page).await?;
    let project_ids: Vec<i64> = projects.iter().map(|p| p.id).collect();

    let submissions = sqlx::query_as::<_, Submission>(
        "SELECT DISTINCT ON (from_project_id) \
                id, deadline_id, from_project_id, from_user_id, to_project_id, to_user_id, \
                is_draft, created_at, updated_at \
         FROM submissions \
         WHERE deadline_id = $1 AND from_project_id = ANY($2) AND NOT is_draft \
         ORDER BY from_project_id, updated_at DESC, id DESC",
    )
    .bind(deadline_id)
    .bind(&project_ids)
    .fetch_all(pool)
    .await?;
    let mut latest: HashMap<i64, Submission> = submissions
        .into_iter()
        .filter_map(|s| s.from_project_id.map(|pid| (pid, s)))
        .collect();

    let projects = projects
        .into_iter()
        .map(|p| {
            let submission = latest.remove(&p.id);
            let status = classify(submission.as_ref(), deadline.due_by);
            ProjectStatus { project: p, submission, status }
        })
        .collect();
    Ok(AdminDashboard { deadline, projects })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_filter_narrows_role_types() {
        let student = [DeadlineType::Milestone, DeadlineType::Evaluation, DeadlineType::Feedback];
        assert_eq!(types_for(&student, None), student.to_vec());
        assert_eq!(types_for(&student, Some(DeadlineType::Feedback)), vec![DeadlineType::Feedback]);
        assert!(types_for(&student, Some(DeadlineType::Application)).is_empty());
    }
}
