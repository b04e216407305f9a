use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::onboarding::{StudentRow, TeamRow};
use crate::models::project::Achievement;
use crate::models::submission::Answer;
use crate::text_enum;

text_enum! {
    pub enum ApplicationStatus { Unprocessed, Approved, Rejected }
}

impl ApplicationStatus {
    /// Guard a review decision. Approved is final; a rejected application may
    /// still be approved later but not rejected twice.
    pub fn transition(self, to: ApplicationStatus) -> Result<ApplicationStatus, AppError> {
        match (self, to) {
            (ApplicationStatus::Approved, _) => {
                Err(AppError::BadRequest("Application has already been approved".to_string()))
            }
            (ApplicationStatus::Rejected, ApplicationStatus::Rejected) => {
                Err(AppError::BadRequest("Application has already been rejected".to_string()))
            }
            (_, ApplicationStatus::Unprocessed) => Err(AppError::BadRequest(
                "Application cannot be returned to Unprocessed".to_string(),
            )),
            (_, to) => Ok(to),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub submission_id: i64,
    pub cohort_year: i32,
    pub schema_version: i32,
    pub team_name: String,
    #[sqlx(try_from = "String")]
    pub achievement: Achievement,
    pub student1_name: String,
    pub student1_email: String,
    pub student1_matriculation_no: String,
    pub student1_nusnet_id: String,
    pub student2_name: String,
    pub student2_email: String,
    pub student2_matriculation_no: String,
    pub student2_nusnet_id: String,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

impl Application {
    /// The team this application turns into once approved.
    pub fn team(&self) -> TeamRow {
        TeamRow {
            team_name: self.team_name.clone(),
            achievement: self.achievement,
            students: vec![
                StudentRow {
                    name: self.student1_name.clone(),
                    email: self.student1_email.clone(),
                    matriculation_no: self.student1_matriculation_no.clone(),
                    nusnet_id: self.student1_nusnet_id.clone(),
                },
                StudentRow {
                    name: self.student2_name.clone(),
                    email: self.student2_email.clone(),
                    matriculation_no: self.student2_matriculation_no.clone(),
                    nusnet_id: self.student2_nusnet_id.clone(),
                },
            ],
            adviser_id: None,
            mentor_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub deadline_id: i64,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewApplication {
    pub deadline_id: i64,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationQuery {
    pub cohort_year: Option<i32>,
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::ApplicationStatus::*;

    #[test]
    fn review_state_machine() {
        assert_eq!(Unprocessed.transition(Approved).unwrap(), Approved);
        assert_eq!(Unprocessed.transition(Rejected).unwrap(), Rejected);
        assert_eq!(Rejected.transition(Approved).unwrap(), Approved);

        let err = Approved.transition(Rejected).unwrap_err();
        assert_eq!(err.to_string(), "Application has already been approved");
        let err = Approved.transition(Approved).unwrap_err();
        assert_eq!(err.to_string(), "Application has already been approved");
        let err = Rejected.transition(Rejected).unwrap_err();
        assert_eq!(err.to_string(), "Application has already been rejected");
    }
}
