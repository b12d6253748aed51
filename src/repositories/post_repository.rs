// src/repositories/post_repository.rs
use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::dtos::post_dtos::{InsertPostRow, PostRow};
use crate::error::{BoardError, BoardResult};
use crate::models::post::{NewPost, Post, PostOrder};
use crate::models::session::Session;

/// The document store holding the post collection.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Writes `record` and returns the id the store assigned.
    async fn insert(&self, record: &NewPost, session: &Session) -> BoardResult<String>;

    /// Every post in the collection, materialized, in `order`.
    async fn query_all(&self, order: PostOrder, session: Option<&Session>) -> BoardResult<Vec<Post>>;
}

/// Posts table behind Supabase PostgREST.
#[derive(Clone)]
pub struct PostRepository {
    client: Client,
    supabase_url: String,
    anon_key: String,
    table: String,
}

impl PostRepository {
    pub fn new(client: Client, supabase_url: &str, anon_key: &str, table: &str) -> Self {
        Self {
            client,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            table: table.to_string(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.supabase_url, self.table)
    }

    fn bearer(&self, session: Option<&Session>) -> String {
        let token = session
            .and_then(|s| s.access_token.as_deref())
            .unwrap_or(&self.anon_key);
        format!("Bearer {}", token)
    }
}

#[async_trait]
impl PostStore for PostRepository {
    async fn insert(&self, record: &NewPost, session: &Session) -> BoardResult<String> {
        let response = self
            .client
            .post(self.table_url())
            .header("apikey", &self.anon_key)
            .header("Authorization", self.bearer(Some(session)))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(&InsertPostRow::from(record))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BoardError::Supabase(format!("Failed to create post: {} - {}", status, body)));
        }

        let rows: Vec<PostRow> = serde_json::from_str(&body)?;
        let id = rows
            .first()
            .map(PostRow::id_string)
            .ok_or_else(|| BoardError::Supabase("No post returned from creation".to_string()))?;
        debug!("post {} created by {}", id, record.author);
        Ok(id)
    }

    async fn query_all(&self, order: PostOrder, session: Option<&Session>) -> BoardResult<Vec<Post>> {
        let order_param = format!("{}.{}", PostOrder::FIELD, order.direction.as_postgrest());

        let response = self
            .client
            .get(self.table_url())
            .header("apikey", &self.anon_key)
            .header("Authorization", self.bearer(session))
            .query(&[("select", "*"), ("order", order_param.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BoardError::Supabase(format!("Failed to fetch posts: {} - {}", status, body)));
        }

        let rows: Vec<PostRow> = serde_json::from_str(&body)?;
        debug!("fetched {} posts", rows.len());
        Ok(rows.into_iter().map(Post::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo(uri: &str) -> PostRepository {
        PostRepository::new(Client::new(), uri, "anon", "posts")
    }

    #[tokio::test]
    async fn insert_sends_record_without_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/posts"))
            .and(header("prefer", "return=representation"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({
                "title": "Hi",
                "content": "World",
                "image_url": "",
                "author": "a@b.com"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": 42,
                "title": "Hi",
                "content": "World",
                "image_url": "",
                "author": "a@b.com",
                "created_at": "2024-05-01T10:00:00.123456+00:00"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let record = NewPost {
            title: "Hi".to_string(),
            content: "World".to_string(),
            image_url: String::new(),
            author: "a@b.com".to_string(),
        };
        let session = Session::new("u1", Some("a@b.com".into())).with_access_token("tok");
        let id = repo(&server.uri()).insert(&record, &session).await.unwrap();
        assert_eq!(id, "42");
    }

    #[tokio::test]
    async fn query_asks_for_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("select", "*"))
            .and(header("authorization", "Bearer anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "b", "title": "new", "content": "x", "image_url": null,
                  "author": "a@b.com", "created_at": "2024-05-02T00:00:00Z" },
                { "id": "a", "title": "old", "content": "y", "image_url": "http://img",
                  "author": "c@d.com", "created_at": "2024-05-01T00:00:00Z" }
            ])))
            .mount(&server)
            .await;

        let posts = repo(&server.uri())
            .query_all(PostOrder::newest_first(), None)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "b");
        assert_eq!(posts[0].image_url, "");
        assert_eq!(posts[1].image_url, "http://img");
    }

    #[tokio::test]
    async fn failed_query_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = repo(&server.uri())
            .query_all(PostOrder::newest_first(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
