use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::thread::CommentNode;
use crate::text_enum;

text_enum! {
    pub enum ForumCategory { General, Technical, Administrative, Showcase }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    pub id: i64,
    pub cohort_year: i32,
    pub author_id: i64,
    pub author_name: String,
    #[sqlx(try_from = "String")]
    pub category: ForumCategory,
    pub title: String,
    pub content: String,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForumPostDetail {
    #[serde(flatten)]
    pub post: ForumPost,
    pub comments: Vec<CommentNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewForumPost {
    pub cohort_year: Option<i32>,
    #[serde(default = "default_category")]
    pub category: ForumCategory,
    pub title: String,
    pub content: String,
}

fn default_category() -> ForumCategory {
    ForumCategory::General
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForumPostUpdate {
    pub category: Option<ForumCategory>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumQuery {
    pub cohort_year: Option<i32>,
    pub category: Option<ForumCategory>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
