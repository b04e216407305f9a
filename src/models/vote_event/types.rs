use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::project::Project;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteEvent {
    pub id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_published: bool,
}

impl VoteEvent {
    /// Votes are accepted while published and inside `[start_time, end_time)`.
    pub fn check_open(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if !self.is_published {
            return Err(AppError::BadRequest(format!("Vote event {} is not published", self.id)));
        }
        if now < self.start_time {
            return Err(AppError::BadRequest(format!("Vote event {} has not started", self.id)));
        }
        if now >= self.end_time {
            return Err(AppError::BadRequest(format!("Vote event {} has ended", self.id)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoterManagement {
    pub vote_event_id: i64,
    pub has_internal_list: bool,
    pub has_external_list: bool,
    pub is_registration_open: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteEventDetail {
    #[serde(flatten)]
    pub event: VoteEvent,
    pub voter_management: VoterManagement,
    pub candidates: Vec<Project>,
    pub internal_voter_count: i64,
    pub external_voter_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewVoteEvent {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VoteEventUpdate {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VoterManagementUpdate {
    pub has_internal_list: Option<bool>,
    pub has_external_list: Option<bool>,
    pub is_registration_open: Option<bool>,
}

/// Someone casting a vote: a registered user or the holder of an external voter code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Voter {
    Internal(i64),
    External(String),
}

impl Voter {
    pub fn key(&self) -> String {
        match self {
            Voter::Internal(user_id) => format!("user:{user_id}"),
            Voter::External(code) => format!("ext:{code}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub project_id: i64,
    pub project_name: String,
    pub votes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn event(is_published: bool) -> VoteEvent {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap();
        VoteEvent { id: 1, title: "Showcase".into(), start_time: start, end_time: start + Duration::hours(8), is_published }
    }

    #[test]
    fn open_only_inside_published_window() {
        let e = event(true);
        assert!(e.check_open(e.start_time).is_ok());
        assert!(e.check_open(e.start_time - Duration::seconds(1)).is_err());
        assert!(e.check_open(e.end_time).is_err());
        assert!(event(false).check_open(e.start_time + Duration::hours(1)).is_err());
    }

    #[test]
    fn voter_keys_are_namespaced() {
        assert_eq!(Voter::Internal(42).key(), "user:42");
        assert_eq!(Voter::External("X7Q".into()).key(), "ext:X7Q");
    }
}
