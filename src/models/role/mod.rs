//! Per-cohort role records. A user "is" a student, adviser, mentor or
//! administrator of a cohort by holding the matching record; there is at most
//! one record per (user, cohort, role type).

pub mod administrator;
pub mod adviser;
pub mod mentor;
pub mod student;

use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;

/// The role a user holds in one cohort, carrying the role record itself.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "role", content = "record")]
pub enum Role {
    Administrator(administrator::Administrator),
    Adviser(adviser::Adviser),
    Mentor(mentor::Mentor),
    Student(student::Student),
    None,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Administrator(_) => "Administrator",
            Role::Adviser(_) => "Adviser",
            Role::Mentor(_) => "Mentor",
            Role::Student(_) => "Student",
            Role::None => "None",
        }
    }
}

/// All role records a user holds in a cohort, most privileged first.
/// Returns `[Role::None]` when the user holds none.
pub async fn find_roles(pool: &PgPool, user_id: i64, cohort_year: i32) -> Result<Vec<Role>, AppError> {
    let (admin, adviser, mentor, student) = tokio::try_join!(
        administrator::find_by_user_and_cohort(pool, user_id, cohort_year),
        adviser::find_by_user_and_cohort(pool, user_id, cohort_year),
        mentor::find_by_user_and_cohort(pool, user_id, cohort_year),
        student::find_by_user_and_cohort(pool, user_id, cohort_year),
    )?;

    let mut roles = Vec::new();
    roles.extend(admin.map(Role::Administrator));
    roles.extend(adviser.map(Role::Adviser));
    roles.extend(mentor.map(Role::Mentor));
    roles.extend(student.map(Role::Student));
    if roles.is_empty() {
        roles.push(Role::None);
    }
    Ok(roles)
}
