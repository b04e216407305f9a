use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::role::Role;
use crate::text_enum;

text_enum! {
    pub enum Audience { All, Student, Adviser, Mentor }
}

/// Audiences whose announcements a user with these roles may read. `None`
/// means every audience.
pub fn audiences_for(roles: &[Role]) -> Option<Vec<Audience>> {
    let mut audiences = vec![Audience::All];
    for role in roles {
        match role {
            Role::Administrator(_) => return None,
            Role::Student(_) => audiences.push(Audience::Student),
            Role::Adviser(_) => audiences.push(Audience::Adviser),
            Role::Mentor(_) => audiences.push(Audience::Mentor),
            Role::None => {}
        }
    }
    Some(audiences)
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: i64,
    pub cohort_year: i32,
    #[sqlx(try_from = "String")]
    pub target_audience: Audience,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_read: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewAnnouncement {
    pub cohort_year: i32,
    #[serde(default = "default_audience")]
    pub target_audience: Audience,
    pub title: String,
    pub content: String,
}

fn default_audience() -> Audience {
    Audience::All
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnnouncementUpdate {
    pub target_audience: Option<Audience>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::student::Student;

    #[test]
    fn students_see_all_and_student_audiences() {
        let student = Role::Student(Student {
            id: 1,
            user_id: 1,
            cohort_year: 2024,
            project_id: None,
            matriculation_no: "A0000001X".into(),
            nusnet_id: "E0000001".into(),
        });
        assert_eq!(audiences_for(&[student]), Some(vec![Audience::All, Audience::Student]));
        assert_eq!(audiences_for(&[Role::None]), Some(vec![Audience::All]));
    }
}
