use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::principal::Principal;
use crate::errors::AppError;
use crate::handlers::CountResponse;
use crate::models::vote_event::{self, NewVoteEvent, Voter, VoteEventUpdate, VoterManagementUpdate};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserIds {
    pub user_ids: Vec<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VoterIds {
    pub voter_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectIds {
    pub project_ids: Vec<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Ballot {
    pub project_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExternalBallot {
    pub voter_id: String,
    pub project_id: i64,
}

/// Everything but external voting, which is mounted publicly.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/vote-events", web::get().to(list))
        .route("/vote-events", web::post().to(create))
        .route("/vote-events/{id}", web::get().to(read))
        .route("/vote-events/{id}", web::put().to(update))
        .route("/vote-events/{id}", web::delete().to(delete))
        .route("/vote-events/{id}/voter-management", web::put().to(update_voter_management))
        .route("/vote-events/{id}/internal-voters", web::post().to(add_internal_voters))
        .route("/vote-events/{id}/internal-voters/{user_id}", web::delete().to(remove_internal_voter))
        .route("/vote-events/{id}/external-voters", web::post().to(add_external_voters))
        .route("/vote-events/{id}/external-voters", web::delete().to(remove_external_voters))
        .route("/vote-events/{id}/candidates", web::post().to(add_candidates))
        .route("/vote-events/{id}/candidates/{project_id}", web::delete().to(remove_candidate))
        .route("/vote-events/{id}/votes", web::post().to(cast_vote))
        .route("/vote-events/{id}/results", web::get().to(results));
}

/// Vote events belong to no cohort; administrators of the current cohort manage them.
async fn require_admin(pool: &PgPool, session: &Session) -> Result<Principal, AppError> {
    let me = Principal::load(pool, session, None).await?;
    me.require_admin()?;
    Ok(me)
}

/// GET /api/vote-events. Unpublished events are listed for administrators only.
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let me = Principal::load(&pool, &session, None).await?;
    let mut events = vote_event::find_all(&pool).await?;
    if !me.is_admin() {
        events.retain(|e| e.is_published);
    }
    Ok(HttpResponse::Ok().json(events))
}

pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<NewVoteEvent>,
) -> Result<HttpResponse, AppError> {
    let me = require_admin(&pool, &session).await?;
    let detail = vote_event::create(&pool, &body).await?;
    log::info!("Vote event {} '{}' created by user {}", detail.event.id, detail.event.title, me.user_id);
    Ok(HttpResponse::Created().json(detail))
}

pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::load(&pool, &session, None).await?;
    let detail = vote_event::get_detail(&pool, path.into_inner()).await?;
    if !detail.event.is_published && !me.is_admin() {
        return Err(AppError::not_found("Vote event", detail.event.id));
    }
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn update(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<VoteEventUpdate>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    Ok(HttpResponse::Ok().json(vote_event::update(&pool, path.into_inner(), &body).await?))
}

pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let me = require_admin(&pool, &session).await?;
    let id = path.into_inner();
    vote_event::delete(&pool, id).await?;
    log::info!("Vote event {id} deleted by user {}", me.user_id);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn update_voter_management(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<VoterManagementUpdate>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    Ok(HttpResponse::Ok().json(vote_event::update_voter_management(&pool, path.into_inner(), &body).await?))
}

pub async fn add_internal_voters(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<UserIds>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    let count = vote_event::add_internal_voters(&pool, path.into_inner(), &body.user_ids).await?;
    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

pub async fn remove_internal_voter(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    let (id, user_id) = path.into_inner();
    vote_event::remove_internal_voter(&pool, id, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/vote-events/{id}/external-voters: a batch of voter codes.
/// Blank and already registered codes are skipped.
pub async fn add_external_voters(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<VoterIds>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    let count = vote_event::add_external_voters(&pool, path.into_inner(), &body.voter_ids).await?;
    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

pub async fn remove_external_voters(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<VoterIds>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    let count = vote_event::remove_external_voters(&pool, path.into_inner(), &body.voter_ids).await?;
    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

pub async fn add_candidates(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<ProjectIds>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    let count = vote_event::add_candidates(&pool, path.into_inner(), &body.project_ids).await?;
    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

pub async fn remove_candidate(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
    require_admin(&pool, &session).await?;
    let (id, project_id) = path.into_inner();
    vote_event::remove_candidate(&pool, id, project_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/vote-events/{id}/votes: the signed-in user votes as an internal voter.
pub async fn cast_vote(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<Ballot>,
) -> Result<HttpResponse, AppError> {
    let user_id = crate::auth::session::require_user_id(&session)?;
    let id = path.into_inner();
    vote_event::cast_vote(&pool, id, &Voter::Internal(user_id), body.project_id).await?;
    log::info!("User {user_id} voted in event {id}");
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/vote-events/{id}/external-votes. No session: the voter code
/// identifies the voter.
pub async fn cast_external_vote(
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    body: web::Json<ExternalBallot>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let code = body.voter_id.trim().to_string();
    if code.is_empty() {
        return Err(AppError::BadRequest("voterId is required".to_string()));
    }
    vote_event::cast_vote(&pool, id, &Voter::External(code), body.project_id).await?;
    log::info!("External voter cast a vote in event {id}");
    Ok(HttpResponse::NoContent().finish())
}

/// Tallies are visible to administrators at any time and to everyone else
/// once the event has ended.
pub async fn results(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let me = Principal::load(&pool, &session, None).await?;
    let id = path.into_inner();
    if !me.is_admin() {
        let event = vote_event::get(&pool, id).await?;
        if !event.is_published || event.end_time > Utc::now() {
            return Err(AppError::BadRequest(format!("Results of vote event {id} are not available yet")));
        }
    }
    Ok(HttpResponse::Ok().json(vote_event::results(&pool, id).await?))
}
