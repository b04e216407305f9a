//! Deadline submissions. Senders (a project's members, or the user in
//! `fromUserId`) write their own submissions; recipients and the sending
//! project's staff may read them.

use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::errors::AppError;
use crate::models::{deadline, project};
use crate::models::submission::{self, NewSubmission, Submission, SubmissionQuery, SubmissionUpdate, Target};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/submissions", web::get().to(list))
        .route("/submissions", web::post().to(create))
        .route("/submissions/{id}", web::get().to(read))
        .route("/submissions/{id}", web::put().to(update))
        .route("/submissions/{id}", web::delete().to(delete));
}

fn may_write(me: &Principal, target: &Target) -> bool {
    me.is_admin()
        || target.from_user_id == Some(me.user_id)
        || target.from_project_id.is_some_and(|p| me.is_member_of(p))
}

/// Members, adviser and mentor of the project.
async fn is_project_staff_or_member(pool: &PgPool, me: &Principal, project_id: i64) -> Result<bool, AppError> {
    if me.is_member_of(project_id) {
        return Ok(true);
    }
    let project = project::get(pool, project_id).await?;
    let adviser = me.adviser().map(|a| a.id);
    let mentor = me.mentor().map(|m| m.id);
    Ok((adviser.is_some() && project.adviser_id == adviser) || (mentor.is_some() && project.mentor_id == mentor))
}

async fn may_read(pool: &PgPool, me: &Principal, s: &Submission) -> Result<bool, AppError> {
    if may_write(me, &s.target()) || s.to_user_id == Some(me.user_id) {
        return Ok(true);
    }
    match s.from_project_id {
        Some(p) => is_project_staff_or_member(pool, me, p).await,
        None => Ok(false),
    }
}

/// Roles are resolved in the cohort of the submission's deadline.
async fn load_for_deadline(pool: &PgPool, session: &Session, deadline_id: i64) -> Result<Principal, AppError> {
    let deadline = deadline::get(pool, deadline_id).await?;
    Principal::load(pool, session, Some(deadline.cohort_year)).await
}

/// The cohort a listing is about: the deadline's, else the project's, else
/// the current one.
async fn list_cohort(pool: &PgPool, query: &SubmissionQuery) -> Result<Option<i32>, AppError> {
    if let Some(id) = query.deadline_id {
        return Ok(Some(deadline::get(pool, id).await?.cohort_year));
    }
    match query.from_project_id {
        Some(id) => Ok(Some(project::get(pool, id).await?.cohort_year)),
        None => Ok(None),
    }
}

/// GET /api/submissions?deadlineId=&fromProjectId=&fromUserId=
/// Administrators of the listed cohort may list anything; others must filter
/// by themselves or by a project they belong to or supervise.
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<SubmissionQuery>,
) -> Result<HttpResponse, AppError> {
    let cohort_year = list_cohort(&pool, &query).await?;
    let me = Principal::load(&pool, &session, cohort_year).await?;
    let allowed = me.is_admin()
        || query.from_user_id == Some(me.user_id)
        || match query.from_project_id {
            Some(p) => is_project_staff_or_member(&pool, &me, p).await?,
            None => false,
        };
    if !allowed {
        return Err(AppError::PermissionDenied(
            "filter by your own user or one of your projects".to_string(),
        ));
    }
    Ok(HttpResponse::Ok().json(submission::find_all(&pool, &query).await?))
}

pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewSubmission>,
) -> Result<HttpResponse, AppError> {
    let me = load_for_deadline(&pool, &session, body.deadline_id).await?;
    if !may_write(&me, &body.target()) {
        return Err(AppError::PermissionDenied("cannot submit on behalf of others".to_string()));
    }
    let detail = submission::create(&pool, &body).await?;
    log::info!(
        "Submission {} for deadline {} created by user {} (draft: {})",
        detail.submission.id,
        detail.submission.deadline_id,
        me.user_id,
        detail.submission.is_draft
    );
    Ok(HttpResponse::Created().json(detail))
}

pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let detail = submission::get_detail(&pool, path.into_inner()).await?;
    let me = load_for_deadline(&pool, &session, detail.submission.deadline_id).await?;
    if !may_read(&pool, &me, &detail.submission).await? {
        return Err(AppError::PermissionDenied("not your submission".to_string()));
    }
    Ok(HttpResponse::Ok().json(detail))
}

/// PUT /api/submissions/{id}: answers, when given, replace the stored ones.
pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<SubmissionUpdate>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let existing = submission::get(&pool, id).await?;
    let me = load_for_deadline(&pool, &session, existing.deadline_id).await?;
    if !may_write(&me, &existing.target()) {
        return Err(AppError::PermissionDenied("not your submission".to_string()));
    }
    Ok(HttpResponse::Ok().json(submission::update(&pool, id, &body).await?))
}

pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let existing = submission::get(&pool, id).await?;
    let me = load_for_deadline(&pool, &session, existing.deadline_id).await?;
    if !may_write(&me, &existing.target()) {
        return Err(AppError::PermissionDenied("not your submission".to_string()));
    }
    submission::delete(&pool, id).await?;
    log::info!("Submission {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::{Role, student::Student};

    fn member_of(project_id: i64) -> Principal {
        Principal {
            user_id: 5,
            cohort_year: 2024,
            roles: vec![Role::Student(Student {
                id: 1,
                user_id: 5,
                cohort_year: 2024,
                project_id: Some(project_id),
                matriculation_no: "A0000005X".into(),
                nusnet_id: "E0000005".into(),
            })],
        }
    }

    #[test]
    fn members_write_for_their_project_only() {
        let me = member_of(10);
        let own = Target { from_project_id: Some(10), ..Default::default() };
        let other = Target { from_project_id: Some(11), ..Default::default() };
        assert!(may_write(&me, &own));
        assert!(!may_write(&me, &other));
    }

    #[test]
    fn users_write_their_own_evaluations() {
        let me = Principal { user_id: 9, cohort_year: 2024, roles: vec![Role::None] };
        let mine = Target { from_user_id: Some(9), to_project_id: Some(3), ..Default::default() };
        let theirs = Target { from_user_id: Some(8), to_project_id: Some(3), ..Default::default() };
        assert!(may_write(&me, &mine));
        assert!(!may_write(&me, &theirs));
    }
}
