//! The signed-in user resolved against one cohort, with the role checks
//! handlers need.

use actix_session::Session;
use sqlx::PgPool;

use crate::auth::session;
use crate::errors::AppError;
use crate::models::cohort;
use crate::models::role::{self, Role, adviser::Adviser, mentor::Mentor, student::Student};

#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub cohort_year: i32,
    /// Most privileged first; `[Role::None]` when the user holds no record.
    pub roles: Vec<Role>,
}

impl Principal {
    /// Resolve the session user in `cohort_year`, or in the current cohort.
    pub async fn load(pool: &PgPool, session: &Session, cohort_year: Option<i32>) -> Result<Self, AppError> {
        let user_id = session::require_user_id(session)?;
        let cohort_year = cohort::resolve_year(pool, cohort_year).await?;
        let roles = role::find_roles(pool, user_id, cohort_year).await?;
        Ok(Principal { user_id, cohort_year, roles })
    }

    /// Resolve the session user in `cohort_year` and require the administrator
    /// role there. Handlers pass the cohort of the record being changed.
    pub async fn admin_of(pool: &PgPool, session: &Session, cohort_year: i32) -> Result<Self, AppError> {
        let me = Self::load(pool, session, Some(cohort_year)).await?;
        me.require_admin()?;
        Ok(me)
    }

    /// The most privileged role held.
    pub fn role(&self) -> &Role {
        self.roles.first().unwrap_or(&Role::None)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| matches!(r, Role::Administrator(_)))
    }

    pub fn student(&self) -> Option<&Student> {
        self.roles.iter().find_map(|r| match r {
            Role::Student(s) => Some(s),
            _ => None,
        })
    }

    pub fn adviser(&self) -> Option<&Adviser> {
        self.roles.iter().find_map(|r| match r {
            Role::Adviser(a) => Some(a),
            _ => None,
        })
    }

    pub fn mentor(&self) -> Option<&Mentor> {
        self.roles.iter().find_map(|r| match r {
            Role::Mentor(m) => Some(m),
            _ => None,
        })
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(format!(
                "administrator role in cohort {} required",
                self.cohort_year
            )))
        }
    }

    /// Allow the user themself or an administrator.
    pub fn require_self_or_admin(&self, user_id: i64) -> Result<(), AppError> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied("not your account".to_string()))
        }
    }

    /// Whether the user is a student member of `project_id`.
    pub fn is_member_of(&self, project_id: i64) -> bool {
        self.student().and_then(|s| s.project_id) == Some(project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::administrator::Administrator;

    fn student(project_id: Option<i64>) -> Role {
        Role::Student(Student {
            id: 3,
            user_id: 7,
            cohort_year: 2024,
            project_id,
            matriculation_no: "A0000001X".into(),
            nusnet_id: "E0000001".into(),
        })
    }

    #[test]
    fn admin_checks() {
        let admin = Principal {
            user_id: 1,
            cohort_year: 2024,
            roles: vec![Role::Administrator(Administrator { id: 1, user_id: 1, cohort_year: 2024 })],
        };
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_self_or_admin(99).is_ok());
        assert_eq!(admin.role().name(), "Administrator");

        let nobody = Principal { user_id: 2, cohort_year: 2024, roles: vec![Role::None] };
        assert!(matches!(nobody.require_admin(), Err(AppError::PermissionDenied(_))));
        assert!(nobody.require_self_or_admin(2).is_ok());
        assert!(nobody.require_self_or_admin(3).is_err());
    }

    #[test]
    fn membership_follows_student_record() {
        let p = Principal { user_id: 7, cohort_year: 2024, roles: vec![student(Some(11))] };
        assert!(p.is_member_of(11));
        assert!(!p.is_member_of(12));
        assert_eq!(p.student().map(|s| s.id), Some(3));
        assert!(p.adviser().is_none());

        let unassigned = Principal { user_id: 7, cohort_year: 2024, roles: vec![student(None)] };
        assert!(!unassigned.is_member_of(11));
    }
}
