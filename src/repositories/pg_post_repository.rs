// src/repositories/pg_post_repository.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use log::debug;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::config::is_plain_identifier;
use crate::error::{BoardError, BoardResult};
use crate::models::post::{NewPost, Post, PostOrder};
use crate::models::session::Session;
use crate::repositories::post_repository::PostStore;

/// Posts table read and written directly over a Postgres pool.
///
/// Expects `id uuid default gen_random_uuid()` and
/// `created_at timestamptz default now()` on the table.
#[derive(Clone)]
pub struct PgPostRepository {
    pool: Pool,
    table: String,
}

impl PgPostRepository {
    pub fn new(pool: Pool, table: &str) -> BoardResult<Self> {
        if !is_plain_identifier(table) {
            return Err(BoardError::InvalidInput(format!("bad table name '{}'", table)));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (title, content, image_url, author) VALUES ($1, $2, $3, $4) RETURNING id",
            self.table
        )
    }

    fn select_sql(&self, order: PostOrder) -> String {
        format!(
            "SELECT id, title, content, image_url, author, created_at FROM {} ORDER BY {} {}",
            self.table,
            PostOrder::FIELD,
            order.direction.as_sql()
        )
    }
}

fn post_from_row(row: &Row) -> BoardResult<Post> {
    let id: Uuid = row.try_get("id")?;
    let image_url: Option<String> = row.try_get("image_url")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(Post {
        id: id.to_string(),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        image_url: image_url.unwrap_or_default(),
        created_at,
        author: row.try_get("author")?,
    })
}

#[async_trait]
impl PostStore for PgPostRepository {
    async fn insert(&self, record: &NewPost, _session: &Session) -> BoardResult<String> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &self.insert_sql(),
                &[&record.title, &record.content, &record.image_url, &record.author],
            )
            .await?;
        let id: Uuid = row.try_get("id")?;
        debug!("post {} inserted into {}", id, self.table);
        Ok(id.to_string())
    }

    async fn query_all(&self, order: PostOrder, _session: Option<&Session>) -> BoardResult<Vec<Post>> {
        let client = self.pool.get().await?;
        let rows = client.query(&self.select_sql(order), &[]).await?;
        rows.iter().map(post_from_row).collect()
    }
}
