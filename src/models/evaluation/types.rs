use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::project::Project;
use crate::models::role::adviser::AdviserView;

#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRelation {
    pub id: i64,
    pub from_project_id: i64,
    pub to_project_id: i64,
}

/// A relation with its endpoints resolved. An endpoint the caller filtered on
/// is left out, as is the adviser when the evaluating project has none.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRelationView {
    pub id: i64,
    pub from_project_id: i64,
    pub to_project_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_project: Option<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_project: Option<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adviser: Option<AdviserView>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationFilter {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRelation {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRelationGroup {
    pub project_ids: Vec<i64>,
}

/// Every ordered pair `(a, b)` with `a != b`, duplicates in the input ignored.
pub fn group_pairs(project_ids: &[i64]) -> Vec<(i64, i64)> {
    let mut ids = project_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    let mut pairs = Vec::with_capacity(ids.len() * ids.len().saturating_sub(1));
    for &a in &ids {
        for &b in &ids {
            if a != b {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

/// Attach endpoint projects and the evaluating project's adviser to each relation.
/// `filter.from` suppresses `from_project`, `filter.to` suppresses `to_project`.
pub fn attach(
    relations: Vec<EvaluationRelation>,
    projects: &HashMap<i64, Project>,
    advisers: &HashMap<i64, AdviserView>,
    filter: RelationFilter,
) -> Vec<EvaluationRelationView> {
    relations
        .into_iter()
        .map(|r| {
            let from_project = projects.get(&r.from_project_id);
            let adviser = from_project
                .and_then(|p| p.adviser_id)
                .and_then(|aid| advisers.get(&aid))
                .cloned();
            EvaluationRelationView {
                id: r.id,
                from_project_id: r.from_project_id,
                to_project_id: r.to_project_id,
                from_project: if filter.from.is_some() { None } else { from_project.cloned() },
                to_project: if filter.to.is_some() {
                    None
                } else {
                    projects.get(&r.to_project_id).cloned()
                },
                adviser,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::Achievement;
    use chrono::Utc;

    fn project(id: i64, adviser_id: Option<i64>) -> Project {
        Project {
            id,
            name: format!("Team {id}"),
            cohort_year: 2024,
            achievement: Achievement::Gemini,
            adviser_id,
            mentor_id: None,
            proposal_pdf_url: None,
            created_at: Utc::now(),
        }
    }

    fn adviser(id: i64) -> AdviserView {
        AdviserView {
            id,
            user_id: 100 + id,
            cohort_year: 2024,
            matriculation_no: None,
            nusnet_id: None,
            name: "Ada".into(),
            email: "ada@u.nus.edu".into(),
            project_count: 1,
        }
    }

    #[test]
    fn group_pairs_are_all_ordered_pairs() {
        let pairs = group_pairs(&[3, 1, 2, 2]);
        assert_eq!(pairs, vec![(1, 2), (1, 3), (2, 1), (2, 3), (3, 1), (3, 2)]);
        assert!(group_pairs(&[7]).is_empty());
    }

    #[test]
    fn filtering_on_from_only_resolves_to_project() {
        let projects = HashMap::from([(1, project(1, Some(9))), (2, project(2, None))]);
        let advisers = HashMap::from([(9, adviser(9))]);
        let relations = vec![EvaluationRelation { id: 5, from_project_id: 1, to_project_id: 2 }];

        let views = attach(relations.clone(), &projects, &advisers, RelationFilter { from: Some(1), to: None });
        assert!(views[0].from_project.is_none());
        assert_eq!(views[0].to_project.as_ref().map(|p| p.id), Some(2));
        assert_eq!(views[0].adviser.as_ref().map(|a| a.id), Some(9));

        let views = attach(relations, &projects, &advisers, RelationFilter { from: None, to: Some(2) });
        assert_eq!(views[0].from_project.as_ref().map(|p| p.id), Some(1));
        assert!(views[0].to_project.is_none());
    }

    #[test]
    fn omitted_endpoints_are_not_serialized() {
        let projects = HashMap::from([(1, project(1, None)), (2, project(2, None))]);
        let relations = vec![EvaluationRelation { id: 5, from_project_id: 1, to_project_id: 2 }];
        let views = attach(relations, &projects, &HashMap::new(), RelationFilter { from: Some(1), to: None });
        let json = serde_json::to_value(&views[0]).unwrap();
        assert!(json.get("fromProject").is_none());
        assert!(json.get("adviser").is_none());
        assert_eq!(json["toProject"]["id"], 2);
    }
}
