// src/repositories/blob_store.rs
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use urlencoding::encode;

use crate::error::{BoardError, BoardResult};
use crate::models::draft::ImageAttachment;
use crate::models::session::Session;

/// Reference to an object already written to the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub bucket: String,
    pub key: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, image: &ImageAttachment, session: &Session) -> BoardResult<BlobHandle>;

    async fn public_url(&self, handle: &BlobHandle) -> BoardResult<String>;
}

/// Object key for a freshly picked image.
pub fn new_image_key() -> String {
    format!("images/{}", uuid::Uuid::new_v4())
}

fn encode_key(key: &str) -> String {
    key.split('/').map(|seg| encode(seg).into_owned()).collect::<Vec<_>>().join("/")
}

/// Supabase Storage bucket.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    supabase_url: String,
    anon_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(client: Client, supabase_url: &str, anon_key: &str, bucket: &str) -> Self {
        Self {
            client,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn put(&self, key: &str, image: &ImageAttachment, session: &Session) -> BoardResult<BlobHandle> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.supabase_url,
            encode(&self.bucket),
            encode_key(key)
        );
        let bearer = session.access_token.as_deref().unwrap_or(&self.anon_key);

        debug!("uploading {} ({} bytes, {})", key, image.bytes.len(), image.content_type);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
            .header("Content-Type", &image.content_type)
            .header("x-upsert", "false")
            .body(image.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BoardError::Supabase(format!("upload failed: {} - {}", status, body)));
        }

        Ok(BlobHandle {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        })
    }

    async fn public_url(&self, handle: &BlobHandle) -> BoardResult<String> {
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.supabase_url,
            encode(&handle.bucket),
            encode_key(&handle.key)
        ))
    }
}
