//! Threaded comments shared by announcements and forum posts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    /// The announcement or forum post the comment belongs to.
    pub thread_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewComment {
    pub content: String,
    pub parent_comment_id: Option<i64>,
}

/// Nest comments under their parents, oldest first at every level. A comment
/// whose parent is missing from the list is treated as top level.
pub fn build_tree(mut comments: Vec<Comment>) -> Vec<CommentNode> {
    comments.sort_by_key(|c| (c.created_at, c.id));
    let ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<i64>, Vec<Comment>> = HashMap::new();
    for c in comments {
        let parent = c.parent_comment_id.filter(|p| ids.contains(p));
        children.entry(parent).or_default().push(c);
    }
    attach(None, &mut children)
}

fn attach(parent: Option<i64>, children: &mut HashMap<Option<i64>, Vec<Comment>>) -> Vec<CommentNode> {
    let level = children.remove(&parent).unwrap_or_default();
    level
        .into_iter()
        .map(|comment| {
            let replies = attach(Some(comment.id), children);
            CommentNode { comment, replies }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn comment(id: i64, parent: Option<i64>, minute: i64) -> Comment {
        Comment {
            id,
            thread_id: 1,
            author_id: 1,
            author_name: "Ann".into(),
            parent_comment_id: parent,
            content: format!("c{id}"),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
        }
    }

    #[test]
    fn nests_replies_in_time_order() {
        let tree = build_tree(vec![
            comment(4, Some(1), 4),
            comment(2, None, 2),
            comment(1, None, 1),
            comment(3, Some(1), 3),
            comment(5, Some(3), 5),
        ]);
        let top: Vec<i64> = tree.iter().map(|n| n.comment.id).collect();
        assert_eq!(top, vec![1, 2]);
        let replies: Vec<i64> = tree[0].replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(replies, vec![3, 4]);
        assert_eq!(tree[0].replies[0].replies[0].comment.id, 5);
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn orphans_surface_at_top_level() {
        let tree = build_tree(vec![comment(7, Some(99), 1)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, 7);
    }
}
