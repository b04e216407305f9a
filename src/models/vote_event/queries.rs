use chrono::Utc;
use sqlx::PgPool;

use super::types::*;
use crate::errors::AppError;
use crate::models::project::Project;

const SELECT_EVENT: &str = "SELECT id, title, start_time, end_time, is_published FROM vote_events";

fn check_window(start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> Result<(), AppError> {
    if start >= end {
        return Err(AppError::BadRequest("Vote event must start before it ends".to_string()));
    }
    Ok(())
}

pub async fn create(pool: &PgPool, new: &NewVoteEvent) -> Result<VoteEventDetail, AppError> {
    if new.title.trim().is_empty() {
        return Err(AppError::BadRequest("Vote event title is required".to_string()));
    }
    check_window(new.start_time, new.end_time)?;

    let mut tx = pool.begin().await?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO vote_events (title, start_time, end_time, is_published) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(new.title.trim())
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(new.is_published)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query("INSERT INTO voter_management (vote_event_id) VALUES ($1)")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    log::info!("Created vote event {id} '{}'", new.title.trim());
    get_detail(pool, id).await
}

pub async fn find_all(pool: &PgPool) -> Result<Vec<VoteEvent>, AppError> {
    let sql = format!("{SELECT_EVENT} ORDER BY start_time DESC, id DESC");
    Ok(sqlx::query_as::<_, VoteEvent>(&sql).fetch_all(pool).await?)
}

pub async fn get(pool: &PgPool, id: i64) -> Result<VoteEvent, AppError> {
    let sql = format!("{SELECT_EVENT} WHERE id = $1");
    sqlx::query_as::<_, VoteEvent>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Vote event", id))
}

pub async fn get_voter_management(pool: &PgPool, id: i64) -> Result<VoterManagement, AppError> {
    sqlx::query_as::<_, VoterManagement>(
        "SELECT vote_event_id, has_internal_list, has_external_list, is_registration_open \
         FROM voter_management WHERE vote_event_id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Vote event", id))
}

pub async fn find_candidates(pool: &PgPool, id: i64) -> Result<Vec<Project>, AppError> {
    Ok(sqlx::query_as::<_, Project>(
        "SELECT p.id, p.name, p.cohort_year, p.achievement, p.adviser_id, p.mentor_id, \
                p.proposal_pdf_url, p.created_at \
         FROM vote_candidates c JOIN projects p ON p.id = c.project_id \
         WHERE c.vote_event_id = $1 ORDER BY p.name, p.id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_detail(pool: &PgPool, id: i64) -> Result<VoteEventDetail, AppError> {
    let counts = async {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM internal_voters WHERE vote_event_id = $1), \
                    (SELECT COUNT(*) FROM external_voters WHERE vote_event_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok::<_, AppError>(row)
    };
    let (event, voter_management, candidates, (internal_voter_count, external_voter_count)) = tokio::try_join!(
        get(pool, id),
        get_voter_management(pool, id),
        find_candidates(pool, id),
        counts,
    )?;
    Ok(VoteEventDetail { event, voter_management, candidates, internal_voter_count, external_voter_count })
}

pub async fn update(pool: &PgPool, id: i64, changes: &VoteEventUpdate) -> Result<VoteEventDetail, AppError> {
    let existing = get(pool, id).await?;
    check_window(
        changes.start_time.unwrap_or(existing.start_time),
        changes.end_time.unwrap_or(existing.end_time),
    )?;
    sqlx::query(
        "UPDATE vote_events SET \
             title = COALESCE($2, title), \
             start_time = COALESCE($3, start_time), \
             end_time = COALESCE($4, end_time), \
             is_published = COALESCE($5, is_published) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(changes.title.as_deref().map(str::trim))
    .bind(changes.start_time)
    .bind(changes.end_time)
    .bind(changes.is_published)
    .execute(pool)
    .await?;
    get_detail(pool, id).await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM vote_events WHERE id = $1").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Vote event", id));
    }
    Ok(())
}

pub async fn update_voter_management(
    pool: &PgPool,
    id: i64,
    changes: &VoterManagementUpdate,
) -> Result<VoterManagement, AppError> {
    sqlx::query_as::<_, VoterManagement>(
        "UPDATE voter_management SET \
             has_internal_list = COALESCE($2, has_internal_list), \
             has_external_list = COALESCE($3, has_external_list), \
             is_registration_open = COALESCE($4, is_registration_open) \
         WHERE vote_event_id = $1 \
         RETURNING vote_event_id, has_internal_list, has_external_list, is_registration_open",
    )
    .bind(id)
    .bind(changes.has_internal_list)
    .bind(changes.has_external_list)
    .bind(changes.is_registration_open)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Vote event", id))
}

// --- Voters and candidates ---

/// Register users as internal voters. Already registered users are skipped.
/// Returns the number newly added.
pub async fn add_internal_voters(pool: &PgPool, id: i64, user_ids: &[i64]) -> Result<u64, AppError> {
    get(pool, id).await?;
    let result = sqlx::query(
        "INSERT INTO internal_voters (vote_event_id, user_id) \
         SELECT $1, u FROM UNNEST($2::BIGINT[]) AS t(u) \
         ON CONFLICT (vote_event_id, user_id) DO NOTHING",
    )
    .bind(id)
    .bind(user_ids)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn remove_internal_voter(pool: &PgPool, id: i64, user_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM internal_voters WHERE vote_event_id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {user_id} is not a voter of event {id}")));
    }
    Ok(())
}

/// Register external voter codes. Blank and duplicate codes are skipped.
pub async fn add_external_voters(pool: &PgPool, id: i64, codes: &[String]) -> Result<u64, AppError> {
    get(pool, id).await?;
    let codes: Vec<&str> = codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()).collect();
    let result = sqlx::query(
        "INSERT INTO external_voters (vote_event_id, id) \
         SELECT $1, c FROM UNNEST($2::TEXT[]) AS t(c) \
         ON CONFLICT (vote_event_id, id) DO NOTHING",
    )
    .bind(id)
    .bind(&codes)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn remove_external_voters(pool: &PgPool, id: i64, codes: &[String]) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM external_voters WHERE vote_event_id = $1 AND id = ANY($2)")
        .bind(id)
        .bind(codes)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn add_candidates(pool: &PgPool, id: i64, project_ids: &[i64]) -> Result<u64, AppError> {
    get(pool, id).await?;
    let result = sqlx::query(
        "INSERT INTO vote_candidates (vote_event_id, project_id) \
         SELECT $1, p FROM UNNEST($2::BIGINT[]) AS t(p) \
         ON CONFLICT (vote_event_id, project_id) DO NOTHING",
    )
    .bind(id)
    .bind(project_ids)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn remove_candidate(pool: &PgPool, id: i64, project_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM vote_candidates WHERE vote_event_id = $1 AND project_id = $2")
        .bind(id)
        .bind(project_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Project {project_id} is not a candidate of event {id}")));
    }
    Ok(())
}

// --- Voting ---

async fn check_eligible(pool: &PgPool, id: i64, voter: &Voter) -> Result<(), AppError> {
    let management = get_voter_management(pool, id).await?;
    let eligible = match voter {
        Voter::Internal(user_id) => {
            management.has_internal_list
                && sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM internal_voters WHERE vote_event_id = $1 AND user_id = $2)",
                )
                .bind(id)
                .bind(*user_id)
                .fetch_one(pool)
                .await?
        }
        Voter::External(code) => {
            management.has_external_list
                && sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM external_voters WHERE vote_event_id = $1 AND id = $2)",
                )
                .bind(id)
                .bind(code.trim())
                .fetch_one(pool)
                .await?
        }
    };
    if !eligible {
        return Err(AppError::PermissionDenied(format!("Not a registered voter of event {id}")));
    }
    Ok(())
}

/// Cast one vote for a candidate. A voter may vote for a candidate only once.
pub async fn cast_vote(pool: &PgPool, id: i64, voter: &Voter, project_id: i64) -> Result<(), AppError> {
    let event = get(pool, id).await?;
    event.check_open(Utc::now())?;
    check_eligible(pool, id, voter).await?;

    let is_candidate: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM vote_candidates WHERE vote_event_id = $1 AND project_id = $2)",
    )
    .bind(id)
    .bind(project_id)
    .fetch_one(pool)
    .await?;
    if !is_candidate {
        return Err(AppError::BadRequest(format!(
            "Project {project_id} is not a candidate of event {id}"
        )));
    }

    let result = sqlx::query(
        "INSERT INTO votes (vote_event_id, voter_key, project_id) VALUES ($1, $2, $3) \
         ON CONFLICT (vote_event_id, voter_key, project_id) DO NOTHING",
    )
    .bind(id)
    .bind(voter.key())
    .bind(project_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(format!(
            "Vote for project {project_id} has already been cast"
        )));
    }
    Ok(())
}

/// Votes per candidate, most votes first. Candidates without votes count zero.
pub async fn results(pool: &PgPool, id: i64) -> Result<Vec<VoteTally>, AppError> {
    get(pool, id).await?;
    Ok(sqlx::query_as::<_, VoteTally>(
        "SELECT p.id AS project_id, p.name AS project_name, COUNT(v.voter_key) AS votes \
         FROM vote_candidates c \
         JOIN projects p ON p.id = c.project_id \
         LEFT JOIN votes v ON v.vote_event_id = c.vote_event_id AND v.project_id = c.project_id \
         WHERE c.vote_event_id = $1 \
         GROUP BY p.id, p.name \
         ORDER BY votes DESC, p.name, p.id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?)
}
