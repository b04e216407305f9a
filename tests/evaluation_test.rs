//! Evaluation relations: endpoint resolution, cohort checks and cascades.

mod common;

use sqlx::PgPool;

use common::*;
use skylab::errors::AppError;
use skylab::models::evaluation::{self, RelationFilter};
use skylab::models::project;
use skylab::models::role::adviser;

#[sqlx::test]
async fn from_filter_omits_from_project(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let adviser_id = create_adviser(&pool, YEAR, "adviser@u.nus.edu").await;
    let a = create_project(&pool, YEAR, "Alpha", Some(adviser_id)).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    evaluation::create(&pool, a, b).await.unwrap();

    let from_a = evaluation::find(&pool, RelationFilter { from: Some(a), to: None }).await.unwrap();
    assert_eq!(from_a.len(), 1);
    assert!(from_a[0].from_project.is_none());
    assert_eq!(from_a[0].to_project.as_ref().map(|p| p.id), Some(b));
    assert_eq!(from_a[0].adviser.as_ref().map(|v| v.id), Some(adviser_id));

    let to_b = evaluation::find(&pool, RelationFilter { from: None, to: Some(b) }).await.unwrap();
    assert_eq!(to_b.len(), 1);
    assert!(to_b[0].to_project.is_none());
    assert_eq!(to_b[0].from_project.as_ref().map(|p| p.id), Some(a));

    let both = evaluation::find(&pool, RelationFilter::default()).await.unwrap();
    assert!(both[0].from_project.is_some() && both[0].to_project.is_some());
}

#[sqlx::test]
async fn serialized_view_drops_filtered_endpoint(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let a = create_project(&pool, YEAR, "Alpha", None).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    evaluation::create(&pool, a, b).await.unwrap();

    let views = evaluation::find(&pool, RelationFilter { from: Some(a), to: None }).await.unwrap();
    let json = serde_json::to_value(&views[0]).unwrap();
    assert!(json.get("fromProject").is_none());
    assert!(json.get("adviser").is_none());
    assert_eq!(json["toProject"]["name"], "Beta");
}

#[sqlx::test]
async fn rejects_duplicates_and_cross_cohort_pairs(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    create_cohort(&pool, OTHER_YEAR).await;
    let a = create_project(&pool, YEAR, "Alpha", None).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    let later = create_project(&pool, OTHER_YEAR, "Gamma", None).await;

    evaluation::create(&pool, a, b).await.unwrap();
    assert!(matches!(evaluation::create(&pool, a, b).await, Err(AppError::Conflict(_))));
    assert!(matches!(evaluation::create(&pool, a, later).await, Err(AppError::BadRequest(_))));
    assert!(matches!(evaluation::create(&pool, a, 9_999).await, Err(AppError::NotFound(_))));

    // Self-evaluation is allowed.
    evaluation::create(&pool, a, a).await.unwrap();
}

#[sqlx::test]
async fn group_creates_every_ordered_pair_once(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let a = create_project(&pool, YEAR, "Alpha", None).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    let c = create_project(&pool, YEAR, "Gamma", None).await;
    evaluation::create(&pool, a, b).await.unwrap();

    let created = evaluation::create_group(&pool, &[a, b, c]).await.unwrap();
    assert_eq!(created.len(), 5);
    let all = evaluation::find(&pool, RelationFilter::default()).await.unwrap();
    assert_eq!(all.len(), 6);

    let again = evaluation::create_group(&pool, &[a, b, c]).await.unwrap();
    assert!(again.is_empty());
}

#[sqlx::test]
async fn deleting_adviser_removes_relations_of_its_projects(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let adviser_id = create_adviser(&pool, YEAR, "adviser@u.nus.edu").await;
    let a = create_project(&pool, YEAR, "Alpha", Some(adviser_id)).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    let c = create_project(&pool, YEAR, "Gamma", None).await;
    evaluation::create(&pool, a, b).await.unwrap();
    evaluation::create(&pool, c, a).await.unwrap();
    evaluation::create(&pool, b, c).await.unwrap();

    assert_eq!(evaluation::find_by_adviser(&pool, adviser_id).await.unwrap().len(), 1);
    adviser::delete(&pool, adviser_id).await.unwrap();

    let left = evaluation::find(&pool, RelationFilter::default()).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!((left[0].from_project_id, left[0].to_project_id), (b, c));
    assert_eq!(project::get(&pool, a).await.unwrap().adviser_id, None);
}

#[sqlx::test]
async fn deleting_project_removes_both_directions(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let a = create_project(&pool, YEAR, "Alpha", None).await;
    let b = create_project(&pool, YEAR, "Beta", None).await;
    let c = create_project(&pool, YEAR, "Gamma", None).await;
    evaluation::create_group(&pool, &[a, b, c]).await.unwrap();

    project::delete(&pool, a).await.unwrap();
    let left = evaluation::find(&pool, RelationFilter::default()).await.unwrap();
    assert_eq!(left.len(), 2);
    assert!(left.iter().all(|r| r.from_project_id != a && r.to_project_id != a));

    assert_eq!(evaluation::delete_by_project(&pool, b).await.unwrap(), 2);
    let relation_id = evaluation::create(&pool, c, c).await.unwrap().id;
    assert_eq!(evaluation::delete(&pool, relation_id).await.unwrap().from_project_id, c);
    assert!(matches!(evaluation::delete(&pool, relation_id).await, Err(AppError::NotFound(_))));
}

#[sqlx::test]
async fn edges_carry_the_adviser_of_their_from_project(pool: PgPool) {
    create_cohort(&pool, YEAR).await;
    let first = create_adviser(&pool, YEAR, "first@u.nus.edu").await;
    let second = create_adviser(&pool, YEAR, "second@u.nus.edu").await;
    let a = create_project(&pool, YEAR, "Alpha", Some(first)).await;
    let b = create_project(&pool, YEAR, "Beta", Some(second)).await;
    let c = create_project(&pool, YEAR, "Gamma", Some(first)).await;
    let d = create_project(&pool, YEAR, "Delta", None).await;
    for (from, to) in [(a, b), (b, c), (c, d), (d, a)] {
        evaluation::create(&pool, from, to).await.unwrap();
    }

    let edges = evaluation::find(&pool, RelationFilter::default()).await.unwrap();
    assert_eq!(edges.len(), 4);
    for edge in &edges {
        let expected = match edge.from_project_id {
            id if id == b => Some(second),
            id if id == d => None,
            _ => Some(first),
        };
        assert_eq!(edge.adviser.as_ref().map(|v| v.id), expected, "edge from {}", edge.from_project_id);
    }

    let mut views = adviser::find_views_by_ids(&pool, &[second, first, first + second + 100]).await.unwrap();
    views.sort_by_key(|v| v.id);
    let counts: Vec<(i64, i64)> = views.iter().map(|v| (v.id, v.project_count)).collect();
    let mut expected = vec![(first, 2), (second, 1)];
    expected.sort_by_key(|(id, _)| *id);
    assert_eq!(counts, expected);
}
