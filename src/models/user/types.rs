use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal user struct for authentication, includes password hash. Never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Safe user shape for responses: no password hash.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub profile_pic_url: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub personal_site_url: Option<String>,
    pub self_intro: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact user reference embedded in other read models.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Account fields a user may edit on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_pic_url: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub personal_site_url: Option<String>,
    pub self_intro: Option<String>,
}

/// Account fields supplied when a user is created together with a role record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
}

pub struct UserPage {
    pub users: Vec<UserProfile>,
    pub total_count: i64,
}
