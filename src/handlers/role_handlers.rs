//! Students, advisers, mentors and administrators. Creating a role record can
//! create its user account in the same transaction.

use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};

use crate::auth::principal::Principal;
use crate::auth::{password, validate};
use crate::errors::{AppError, FieldError};
use crate::handlers::CohortParam;
use crate::mailer::SharedMailer;
use crate::models::common::ListQuery;
use crate::models::onboarding::{self, StudentRow};
use crate::models::role::{Role, administrator, adviser, mentor, student};
use crate::models::user::{self, NewUser, UserInput};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewStudentRequest {
    pub user: Option<UserInput>,
    pub user_id: Option<i64>,
    pub cohort_year: i32,
    pub project_id: Option<i64>,
    pub matriculation_no: String,
    pub nusnet_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewAdviserRequest {
    pub user: Option<UserInput>,
    pub user_id: Option<i64>,
    pub cohort_year: i32,
    pub matriculation_no: Option<String>,
    pub nusnet_id: Option<String>,
}

/// Mentors and administrators carry nothing beyond user and cohort.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRoleRequest {
    pub user: Option<UserInput>,
    pub user_id: Option<i64>,
    pub cohort_year: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentBatch {
    pub cohort_year: i32,
    pub students: Vec<StudentRow>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/students", web::get().to(list_students))
        .route("/students", web::post().to(create_student))
        .route("/students/batch", web::post().to(create_students))
        .route("/students/{id}", web::get().to(read_student))
        .route("/students/{id}", web::put().to(update_student))
        .route("/students/{id}", web::delete().to(delete_student))
        .route("/advisers", web::get().to(list_advisers))
        .route("/advisers", web::post().to(create_adviser))
        .route("/advisers/{id}", web::get().to(read_adviser))
        .route("/advisers/{id}", web::delete().to(delete_adviser))
        .route("/mentors", web::get().to(list_mentors))
        .route("/mentors", web::post().to(create_mentor))
        .route("/mentors/{id}", web::get().to(read_mentor))
        .route("/mentors/{id}", web::delete().to(delete_mentor))
        .route("/administrators", web::get().to(list_administrators))
        .route("/administrators", web::post().to(create_administrator))
        .route("/administrators/{id}", web::delete().to(delete_administrator));
}

/// The user the new role record belongs to: an existing `userId`, or a new
/// account built from `user`. Exactly one must be given.
async fn resolve_user(
    conn: &mut PgConnection,
    input: Option<&UserInput>,
    user_id: Option<i64>,
) -> Result<i64, AppError> {
    match (input, user_id) {
        (Some(input), None) => {
            let errors = [
                validate::validate_required("user.name", &input.name, 200),
                validate::validate_email("user.email", &input.email),
                input.password.as_deref().and_then(|p| validate::validate_password("user.password", p)),
            ]
            .into_iter()
            .flatten()
            .collect();
            validate::finish(errors)?;

            let raw = input.password.clone().unwrap_or_else(|| password::generate_secret(16));
            let hash = password::hash_password(&raw).map_err(AppError::Hash)?;
            let new = NewUser { email: input.email.clone(), password: hash, name: input.name.clone() };
            user::create_in(conn, &new).await
        }
        (None, Some(id)) => {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
            if exists { Ok(id) } else { Err(AppError::not_found("User", id)) }
        }
        _ => Err(AppError::Validation(vec![FieldError::new(
            "user",
            "Provide either a new user or an existing userId",
        )])),
    }
}

// --- Students ---

pub async fn list_students(pool: web::Data<PgPool>, query: web::Query<ListQuery>) -> Result<HttpResponse, AppError> {
    let students =
        student::find_all(&pool, query.cohort_year, query.pattern().as_deref(), query.pagination()?).await?;
    Ok(HttpResponse::Ok().json(students))
}

pub async fn create_student(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewStudentRequest>,
) -> Result<HttpResponse, AppError> {
    Principal::admin_of(&pool, &session, body.cohort_year).await?;
    let errors = [
        validate::validate_matriculation_no("matriculationNo", &body.matriculation_no),
        validate::validate_nusnet_id("nusnetId", &body.nusnet_id),
    ]
    .into_iter()
    .flatten()
    .collect();
    validate::finish(errors)?;

    let mut tx = pool.begin().await?;
    let user_id = resolve_user(&mut tx, body.user.as_ref(), body.user_id).await?;
    let id = student::create_in(
        &mut tx,
        user_id,
        body.cohort_year,
        body.project_id,
        &body.matriculation_no,
        &body.nusnet_id,
    )
    .await?;
    tx.commit().await?;
    log::info!("Created student {id} for user {user_id} in cohort {}", body.cohort_year);
    Ok(HttpResponse::Created().json(student::get_view(&pool, id).await?))
}

/// POST /api/students/batch: best effort, one transaction per row.
pub async fn create_students(
    pool: web::Data<PgPool>,
    session: Session,
    mailer: web::Data<SharedMailer>,
    body: web::Json<StudentBatch>,
) -> Result<HttpResponse, AppError> {
    Principal::admin_of(&pool, &session, body.cohort_year).await?;
    let outcome = onboarding::create_students(&pool, &mailer, body.cohort_year, &body.students).await;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn read_student(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(student::get_view(&pool, path.into_inner()).await?))
}

pub async fn update_student(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<student::StudentUpdate>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    Principal::admin_of(&pool, &session, student::get_record(&pool, id).await?.cohort_year).await?;
    let errors = [
        body.matriculation_no.as_deref().and_then(|m| validate::validate_matriculation_no("matriculationNo", m)),
        body.nusnet_id.as_deref().and_then(|n| validate::validate_nusnet_id("nusnetId", n)),
    ]
    .into_iter()
    .flatten()
    .collect();
    validate::finish(errors)?;
    Ok(HttpResponse::Ok().json(student::update(&pool, id, &body).await?))
}

pub async fn delete_student(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = Principal::admin_of(&pool, &session, student::get_record(&pool, id).await?.cohort_year).await?;
    student::delete(&pool, id).await?;
    log::info!("Student {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}

// --- Advisers ---

pub async fn list_advisers(pool: web::Data<PgPool>, query: web::Query<ListQuery>) -> Result<HttpResponse, AppError> {
    let advisers =
        adviser::find_all(&pool, query.cohort_year, query.pattern().as_deref(), query.pagination()?).await?;
    Ok(HttpResponse::Ok().json(advisers))
}

pub async fn create_adviser(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewAdviserRequest>,
) -> Result<HttpResponse, AppError> {
    Principal::admin_of(&pool, &session, body.cohort_year).await?;
    let errors = [
        body.matriculation_no.as_deref().and_then(|m| validate::validate_matriculation_no("matriculationNo", m)),
        body.nusnet_id.as_deref().and_then(|n| validate::validate_nusnet_id("nusnetId", n)),
    ]
    .into_iter()
    .flatten()
    .collect();
    validate::finish(errors)?;

    let mut tx = pool.begin().await?;
    let user_id = resolve_user(&mut tx, body.user.as_ref(), body.user_id).await?;
    let id = adviser::create_in(
        &mut tx,
        user_id,
        body.cohort_year,
        body.matriculation_no.as_deref(),
        body.nusnet_id.as_deref(),
    )
    .await?;
    tx.commit().await?;
    log::info!("Created adviser {id} for user {user_id} in cohort {}", body.cohort_year);
    Ok(HttpResponse::Created().json(adviser::get_view(&pool, id).await?))
}

pub async fn read_adviser(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(adviser::get_view(&pool, path.into_inner()).await?))
}

pub async fn delete_adviser(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = Principal::admin_of(&pool, &session, adviser::get_record(&pool, id).await?.cohort_year).await?;
    adviser::delete(&pool, id).await?;
    log::info!("Adviser {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}

// --- Mentors ---

pub async fn list_mentors(pool: web::Data<PgPool>, query: web::Query<ListQuery>) -> Result<HttpResponse, AppError> {
    let mentors =
        mentor::find_all(&pool, query.cohort_year, query.pattern().as_deref(), query.pagination()?).await?;
    Ok(HttpResponse::Ok().json(mentors))
}

pub async fn create_mentor(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewRoleRequest>,
) -> Result<HttpResponse, AppError> {
    Principal::admin_of(&pool, &session, body.cohort_year).await?;
    let mut tx = pool.begin().await?;
    let user_id = resolve_user(&mut tx, body.user.as_ref(), body.user_id).await?;
    let id = mentor::create_in(&mut tx, user_id, body.cohort_year).await?;
    tx.commit().await?;
    log::info!("Created mentor {id} for user {user_id} in cohort {}", body.cohort_year);
    Ok(HttpResponse::Created().json(mentor::get_view(&pool, id).await?))
}

pub async fn read_mentor(pool: web::Data<PgPool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(mentor::get_view(&pool, path.into_inner()).await?))
}

pub async fn delete_mentor(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = Principal::admin_of(&pool, &session, mentor::get_record(&pool, id).await?.cohort_year).await?;
    mentor::delete(&pool, id).await?;
    log::info!("Mentor {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}

// --- Administrators ---

pub async fn list_administrators(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<CohortParam>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::load(&pool, &session, query.cohort_year).await?;
    me.require_admin()?;
    Ok(HttpResponse::Ok().json(administrator::find_all(&pool, Some(me.cohort_year)).await?))
}

pub async fn create_administrator(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewRoleRequest>,
) -> Result<HttpResponse, AppError> {
    Principal::admin_of(&pool, &session, body.cohort_year).await?;
    let mut tx = pool.begin().await?;
    let user_id = resolve_user(&mut tx, body.user.as_ref(), body.user_id).await?;
    let id = administrator::create_in(&mut tx, user_id, body.cohort_year).await?;
    tx.commit().await?;
    log::info!("Created administrator {id} for user {user_id} in cohort {}", body.cohort_year);
    Ok(HttpResponse::Created().json(serde_json::json!({ "id": id, "userId": user_id, "cohortYear": body.cohort_year })))
}

pub async fn delete_administrator(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let me = Principal::admin_of(&pool, &session, administrator::get_record(&pool, id).await?.cohort_year).await?;
    if me.roles.iter().any(|r| matches!(r, Role::Administrator(a) if a.id == id)) {
        return Err(AppError::BadRequest("Administrators cannot remove their own record".to_string()));
    }
    administrator::delete(&pool, id).await?;
    Ok(HttpResponse::NoContent().finish())
}
