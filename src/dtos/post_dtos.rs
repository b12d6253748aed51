use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::post::{NewPost, Post};

/// Body sent to PostgREST on insert. `created_at` is filled by the column default.
#[derive(Debug, Serialize)]
pub struct InsertPostRow<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub image_url: &'a str,
    pub author: &'a str,
}

impl<'a> From<&'a NewPost> for InsertPostRow<'a> {
    fn from(p: &'a NewPost) -> Self {
        Self {
            title: &p.title,
            content: &p.content,
            image_url: &p.image_url,
            author: &p.author,
        }
    }
}

/// Row shape returned by PostgREST for the posts table.
#[derive(Debug, Deserialize)]
pub struct PostRow {
    pub id: serde_json::Value,
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: Option<String>,
}

impl PostRow {
    /// Ids may come back as numbers or uuids depending on the table; both become opaque strings.
    pub fn id_string(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let id = row.id_string();
        Post {
            id,
            title: row.title.unwrap_or_default(),
            content: row.content.unwrap_or_default(),
            image_url: row.image_url.unwrap_or_default(),
            created_at: row.created_at,
            author: row.author.unwrap_or_default(),
        }
    }
}

/// Feed entry as rendered to the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostOut {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    /// Display date, e.g. `2024-05-01`.
    pub created_on: String,
    /// Route of the per-post detail view.
    pub href: String,
}
