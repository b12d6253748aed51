use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted board post. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Empty string when no image was attached.
    #[serde(default)]
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
}

/// Record written on submit. `created_at` is left to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_postgrest(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering requested from the document store. Only `created_at` is sortable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostOrder {
    pub direction: Direction,
}

impl PostOrder {
    pub const FIELD: &'static str = "created_at";

    pub fn newest_first() -> Self {
        Self { direction: Direction::Desc }
    }
}

/// Stable in-place sort by `created_at` following `order`.
pub fn sort_posts(posts: &mut [Post], order: PostOrder) {
    match order.direction {
        Direction::Asc => posts.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        Direction::Desc => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(id: &str, secs: i64) -> Post {
        Post {
            id: id.to_string(),
            title: format!("title {}", id),
            content: "body".to_string(),
            image_url: String::new(),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            author: "a@b.com".to_string(),
        }
    }

    #[test]
    fn newest_first_puts_latest_on_top() {
        let mut posts = vec![post("t1", 100), post("t3", 300), post("t2", 200)];
        sort_posts(&mut posts, PostOrder::newest_first());
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn equal_timestamps_keep_backend_order() {
        let mut posts = vec![post("x", 100), post("y", 100), post("z", 50)];
        sort_posts(&mut posts, PostOrder::newest_first());
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn missing_image_url_deserializes_empty() {
        let raw = r#"{"id":"1","title":"Hi","content":"World","created_at":"2024-05-01T10:00:00+00:00","author":"a@b.com"}"#;
        let post: Post = serde_json::from_str(raw).unwrap();
        assert_eq!(post.image_url, "");
    }
}
