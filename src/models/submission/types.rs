use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, FieldError};
use crate::models::deadline::{DeadlineType, Question};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub deadline_id: i64,
    pub from_project_id: Option<i64>,
    pub from_user_id: Option<i64>,
    pub to_project_id: Option<i64>,
    pub to_user_id: Option<i64>,
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn target(&self) -> Target {
        Target {
            from_project_id: self.from_project_id,
            from_user_id: self.from_user_id,
            to_project_id: self.to_project_id,
            to_user_id: self.to_user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: i64,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: Submission,
    pub answers: Vec<Answer>,
}

/// Who a submission is from and who it is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Target {
    pub from_project_id: Option<i64>,
    pub from_user_id: Option<i64>,
    pub to_project_id: Option<i64>,
    pub to_user_id: Option<i64>,
}

impl Target {
    /// Check the from/to combination against the deadline type:
    /// Application has none, Milestone is from a project, Evaluation is from a
    /// project or user to a project, Feedback is from a project to a user.
    pub fn check(&self, deadline_type: DeadlineType) -> Result<(), AppError> {
        let shape = (
            self.from_project_id.is_some(),
            self.from_user_id.is_some(),
            self.to_project_id.is_some(),
            self.to_user_id.is_some(),
        );
        let ok = match deadline_type {
            DeadlineType::Application => shape == (false, false, false, false),
            DeadlineType::Milestone => shape == (true, false, false, false),
            DeadlineType::Evaluation => {
                shape == (true, false, true, false) || shape == (false, true, true, false)
            }
            DeadlineType::Feedback => shape == (true, false, false, true),
        };
        if ok {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Submission sender and recipient do not match a {deadline_type} deadline"
            )))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSubmission {
    pub deadline_id: i64,
    pub from_project_id: Option<i64>,
    pub from_user_id: Option<i64>,
    pub to_project_id: Option<i64>,
    pub to_user_id: Option<i64>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl NewSubmission {
    pub fn target(&self) -> Target {
        Target {
            from_project_id: self.from_project_id,
            from_user_id: self.from_user_id,
            to_project_id: self.to_project_id,
            to_user_id: self.to_user_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubmissionUpdate {
    pub is_draft: Option<bool>,
    pub answers: Option<Vec<Answer>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionQuery {
    pub deadline_id: Option<i64>,
    pub from_project_id: Option<i64>,
    pub from_user_id: Option<i64>,
}

/// Answers must refer to questions of the deadline, at most once each. Final
/// submissions must answer every required question.
pub fn check_answers(questions: &[Question], answers: &[Answer], is_draft: bool) -> Result<(), AppError> {
    let known: HashSet<i64> = questions.iter().map(|q| q.id).collect();
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for a in answers {
        if !known.contains(&a.question_id) {
            errors.push(FieldError::new(
                "answers",
                format!("Question {} does not belong to this deadline", a.question_id),
            ));
        } else if !seen.insert(a.question_id) {
            errors.push(FieldError::new(
                "answers",
                format!("Question {} is answered more than once", a.question_id),
            ));
        }
    }

    if !is_draft {
        for q in questions.iter().filter(|q| q.is_required) {
            let answered = answers
                .iter()
                .any(|a| a.question_id == q.id && !a.answer.trim().is_empty());
            if !answered {
                errors.push(FieldError::new(
                    "answers",
                    format!("Question {} ('{}') is required", q.id, q.question),
                ));
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(AppError::Validation(errors)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::deadline::QuestionType;

    fn question(id: i64, is_required: bool) -> Question {
        Question {
            id,
            section_id: 1,
            deadline_id: 1,
            question_number: id as i32,
            question: format!("Q{id}"),
            description: String::new(),
            question_type: QuestionType::ShortAnswer,
            options: vec![],
            is_required,
        }
    }

    fn answer(question_id: i64, text: &str) -> Answer {
        Answer { question_id, answer: text.to_string() }
    }

    #[test]
    fn target_shapes_per_deadline_type() {
        let none = Target::default();
        let from_project = Target { from_project_id: Some(1), ..none };
        let project_to_project = Target { to_project_id: Some(2), ..from_project };
        let user_to_project = Target { from_user_id: Some(7), to_project_id: Some(2), ..none };
        let project_to_user = Target { to_user_id: Some(7), ..from_project };

        assert!(none.check(DeadlineType::Application).is_ok());
        assert!(from_project.check(DeadlineType::Application).is_err());

        assert!(from_project.check(DeadlineType::Milestone).is_ok());
        assert!(project_to_project.check(DeadlineType::Milestone).is_err());

        assert!(project_to_project.check(DeadlineType::Evaluation).is_ok());
        assert!(user_to_project.check(DeadlineType::Evaluation).is_ok());
        assert!(project_to_user.check(DeadlineType::Evaluation).is_err());

        assert!(project_to_user.check(DeadlineType::Feedback).is_ok());
        assert!(from_project.check(DeadlineType::Feedback).is_err());
    }

    #[test]
    fn drafts_may_skip_required_questions() {
        let questions = vec![question(1, true), question(2, false)];
        assert!(check_answers(&questions, &[], true).is_ok());
        assert!(check_answers(&questions, &[answer(1, "  ")], false).is_err());
        assert!(check_answers(&questions, &[answer(1, "done")], false).is_ok());
    }

    #[test]
    fn foreign_and_repeated_questions_are_rejected() {
        let questions = vec![question(1, false)];
        assert!(check_answers(&questions, &[answer(9, "x")], true).is_err());
        assert!(check_answers(&questions, &[answer(1, "a"), answer(1, "b")], true).is_err());
    }
}
