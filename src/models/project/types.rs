use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::common::double_option;
use crate::models::role::adviser::AdviserView;
use crate::models::role::mentor::MentorView;
use crate::models::role::student::StudentView;
use crate::text_enum;

text_enum! {
    /// Graded outcome level of a project, lowest to highest.
    pub enum Achievement { Vostok, Gemini, Apollo, Artemis }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub cohort_year: i32,
    #[sqlx(try_from = "String")]
    pub achievement: Achievement,
    pub adviser_id: Option<i64>,
    pub mentor_id: Option<i64>,
    pub proposal_pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Project with members, adviser and mentor resolved.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub students: Vec<StudentView>,
    pub adviser: Option<AdviserView>,
    pub mentor: Option<MentorView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProject {
    pub name: String,
    pub cohort_year: i32,
    pub achievement: Option<Achievement>,
    pub adviser_id: Option<i64>,
    pub mentor_id: Option<i64>,
    #[serde(default)]
    pub student_ids: Vec<i64>,
    pub proposal_pdf_url: Option<String>,
}

/// Partial update. `adviserId: null` / `mentorId: null` detach; absent keeps.
/// `studentIds` replaces the member list when present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub achievement: Option<Achievement>,
    #[serde(default, deserialize_with = "double_option")]
    pub adviser_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mentor_id: Option<Option<i64>>,
    pub student_ids: Option<Vec<i64>>,
    pub proposal_pdf_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub cohort_year: Option<i32>,
    pub search: Option<String>,
    pub achievement: Option<Achievement>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
