use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use super::types::*;
use crate::errors::AppError;
use crate::models::project::{self, Project};
use crate::models::role::adviser::{self, AdviserView};

const SELECT_RELATION: &str = "SELECT id, from_project_id, to_project_id FROM evaluation_relations";

/// Load the endpoint projects and from-project advisers for a batch of relations.
async fn resolve(
    pool: &PgPool,
    relations: Vec<EvaluationRelation>,
    filter: RelationFilter,
) -> Result<Vec<EvaluationRelationView>, AppError> {
    let mut ids: Vec<i64> = relations
        .iter()
        .flat_map(|r| [r.from_project_id, r.to_project_id])
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let projects: HashMap<i64, Project> = project::find_by_ids(pool, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut adviser_ids: Vec<i64> = relations
        .iter()
        .filter_map(|r| projects.get(&r.from_project_id).and_then(|p| p.adviser_id))
        .collect();
    adviser_ids.sort_unstable();
    adviser_ids.dedup();
    let advisers: HashMap<i64, AdviserView> = adviser::find_views_by_ids(pool, &adviser_ids)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    Ok(attach(relations, &projects, &advisers, filter))
}

/// Create one relation. Both projects must exist and share a cohort.
/// Self-relations are accepted.
pub async fn create(pool: &PgPool, from: i64, to: i64) -> Result<EvaluationRelationView, AppError> {
    let (from_project, to_project) = tokio::try_join!(project::get(pool, from), project::get(pool, to))?;
    if from_project.cohort_year != to_project.cohort_year {
        return Err(AppError::BadRequest(format!(
            "Projects {from} and {to} are not in the same cohort"
        )));
    }

    let relation = sqlx::query_as::<_, EvaluationRelation>(
        "INSERT INTO evaluation_relations (from_project_id, to_project_id) VALUES ($1, $2) \
         RETURNING id, from_project_id, to_project_id",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;
    log::info!("Created evaluation relation {} ({from} -> {to})", relation.id);

    let mut views = resolve(pool, vec![relation], RelationFilter::default()).await?;
    views.pop().ok_or_else(|| AppError::Internal("Created relation vanished".to_string()))
}

/// Make every project in the group evaluate every other one. Pairs that
/// already exist are skipped; only the new relations are returned.
pub async fn create_group(pool: &PgPool, project_ids: &[i64]) -> Result<Vec<EvaluationRelation>, AppError> {
    let pairs = group_pairs(project_ids);
    if pairs.is_empty() {
        return Err(AppError::BadRequest(
            "A relation group needs at least two distinct projects".to_string(),
        ));
    }

    let mut ids: Vec<i64> = project_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    let years: Vec<(i64, i32)> =
        sqlx::query_as("SELECT id, cohort_year FROM projects WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(pool)
            .await?;
    if let Some(missing) = ids.iter().find(|id| !years.iter().any(|(pid, _)| pid == *id)) {
        return Err(AppError::not_found("Project", missing));
    }
    if years.windows(2).any(|w| w[0].1 != w[1].1) {
        return Err(AppError::BadRequest("Projects are not all in the same cohort".to_string()));
    }

    let (froms, tos): (Vec<i64>, Vec<i64>) = pairs.into_iter().unzip();
    let created = sqlx::query_as::<_, EvaluationRelation>(
        "INSERT INTO evaluation_relations (from_project_id, to_project_id) \
         SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[]) \
         ON CONFLICT (from_project_id, to_project_id) DO NOTHING \
         RETURNING id, from_project_id, to_project_id",
    )
    .bind(&froms)
    .bind(&tos)
    .fetch_all(pool)
    .await?;
    log::info!("Created {} evaluation relation(s) for group {:?}", created.len(), ids);
    Ok(created)
}

/// Relations filtered by evaluating and/or evaluated project.
pub async fn find(pool: &PgPool, filter: RelationFilter) -> Result<Vec<EvaluationRelationView>, AppError> {
    let sql = format!(
        "{SELECT_RELATION} \
         WHERE ($1::BIGINT IS NULL OR from_project_id = $1) \
           AND ($2::BIGINT IS NULL OR to_project_id = $2) \
         ORDER BY id"
    );
    let relations = sqlx::query_as::<_, EvaluationRelation>(&sql)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(pool)
        .await?;
    resolve(pool, relations, filter).await
}

/// Raw relations in which `project_id` is the evaluator.
pub async fn find_from_project(pool: &PgPool, project_id: i64) -> Result<Vec<EvaluationRelation>, AppError> {
    let sql = format!("{SELECT_RELATION} WHERE from_project_id = $1 ORDER BY to_project_id, id");
    Ok(sqlx::query_as::<_, EvaluationRelation>(&sql)
        .bind(project_id)
        .fetch_all(pool)
        .await?)
}

/// Every relation whose evaluating project is advised by `adviser_id`.
pub async fn find_by_adviser(pool: &PgPool, adviser_id: i64) -> Result<Vec<EvaluationRelationView>, AppError> {
    adviser::get_record(pool, adviser_id).await?;
    let relations = sqlx::query_as::<_, EvaluationRelation>(
        "SELECT r.id, r.from_project_id, r.to_project_id \
         FROM evaluation_relations r \
         JOIN projects p ON p.id = r.from_project_id \
         WHERE p.adviser_id = $1 \
         ORDER BY r.from_project_id, r.to_project_id",
    )
    .bind(adviser_id)
    .fetch_all(pool)
    .await?;
    resolve(pool, relations, RelationFilter::default()).await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<EvaluationRelationView, AppError> {
    let sql = format!("{SELECT_RELATION} WHERE id = $1");
    let relation = sqlx::query_as::<_, EvaluationRelation>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Evaluation relation", id))?;
    let mut views = resolve(pool, vec![relation], RelationFilter::default()).await?;
    views.pop().ok_or_else(|| AppError::not_found("Evaluation relation", id))
}

/// Cohort of a relation, taken from its evaluating project.
pub async fn cohort_year(pool: &PgPool, id: i64) -> Result<i32, AppError> {
    sqlx::query_scalar(
        "SELECT p.cohort_year FROM evaluation_relations r \
         JOIN projects p ON p.id = r.from_project_id WHERE r.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Evaluation relation", id))
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<EvaluationRelation, AppError> {
    sqlx::query_as::<_, EvaluationRelation>(
        "DELETE FROM evaluation_relations WHERE id = $1 RETURNING id, from_project_id, to_project_id",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Evaluation relation", id))
}

/// Delete relations in either direction touching a project. Returns the number removed.
pub async fn delete_by_project(pool: &PgPool, project_id: i64) -> Result<u64, AppError> {
    project::get(pool, project_id).await?;
    let mut conn = pool.acquire().await?;
    delete_by_project_in(&mut conn, project_id).await
}

pub async fn delete_by_project_in(conn: &mut PgConnection, project_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query(
        "DELETE FROM evaluation_relations WHERE from_project_id = $1 OR to_project_id = $1",
    )
    .bind(project_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Delete relations in either direction touching any project advised by `adviser_id`.
pub async fn delete_by_adviser(pool: &PgPool, adviser_id: i64) -> Result<u64, AppError> {
    adviser::get_record(pool, adviser_id).await?;
    let mut conn = pool.acquire().await?;
    delete_by_adviser_in(&mut conn, adviser_id).await
}

pub async fn delete_by_adviser_in(conn: &mut PgConnection, adviser_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query(
        "DELETE FROM evaluation_relations \
         WHERE from_project_id IN (SELECT id FROM projects WHERE adviser_id = $1) \
            OR to_project_id IN (SELECT id FROM projects WHERE adviser_id = $1)",
    )
    .bind(adviser_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
