use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::common::double_option;
use crate::text_enum;

text_enum! {
    pub enum DeadlineType { Application, Milestone, Evaluation, Feedback }
}

text_enum! {
    pub enum QuestionType {
        ShortAnswer, Paragraph, MultipleChoice, Checkboxes, Dropdown, Url, Date, Time,
    }
}

impl QuestionType {
    /// Choice questions need at least one option to pick from.
    pub fn needs_options(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::Checkboxes | QuestionType::Dropdown)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deadline {
    pub id: i64,
    pub cohort_year: i32,
    pub name: String,
    pub description: String,
    pub due_by: DateTime<Utc>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub deadline_type: DeadlineType,
    pub evaluating_milestone_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: i64,
    pub deadline_id: i64,
    pub section_number: i32,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub section_id: i64,
    pub deadline_id: i64,
    pub question_number: i32,
    pub question: String,
    pub description: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub is_required: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionDetail {
    #[serde(flatten)]
    pub section: Section,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineDetail {
    #[serde(flatten)]
    pub deadline: Deadline,
    pub sections: Vec<SectionDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewQuestion {
    pub question: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default = "default_required")]
    pub is_required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<NewQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewDeadline {
    pub cohort_year: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub due_by: DateTime<Utc>,
    #[serde(rename = "type")]
    pub deadline_type: DeadlineType,
    pub evaluating_milestone_id: Option<i64>,
    #[serde(default)]
    pub sections: Vec<NewSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeadlineUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub due_by: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub evaluating_milestone_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineQuery {
    pub cohort_year: Option<i32>,
    #[serde(rename = "type")]
    pub deadline_type: Option<DeadlineType>,
    pub search: Option<String>,
}
