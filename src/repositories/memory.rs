// src/repositories/memory.rs
//! In-process blob and post stores, used for `BOARD_BACKEND=memory` and in tests.
//! Both share a [`CallLog`] so the order of remote calls can be inspected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::{BoardError, BoardResult};
use crate::models::draft::ImageAttachment;
use crate::models::post::{sort_posts, NewPost, Post, PostOrder};
use crate::models::session::Session;
use crate::repositories::blob_store::{BlobHandle, BlobStore};
use crate::repositories::post_repository::PostStore;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Upload { key: String },
    ResolveUrl { key: String },
    Insert(NewPost),
    Query,
}

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<BackendCall>>>);

impl CallLog {
    pub fn record(&self, call: BackendCall) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

pub struct MemoryBlobStore {
    base_url: String,
    bucket: String,
    objects: Mutex<HashMap<String, ImageAttachment>>,
    log: CallLog,
    fail_uploads: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new(base_url: &str, bucket: &str, log: CallLog) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            objects: Mutex::new(HashMap::new()),
            log,
            fail_uploads: AtomicBool::new(false),
        }
    }

    pub fn get(&self, key: &str) -> Option<ImageAttachment> {
        self.objects.lock().get(key).cloned()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, image: &ImageAttachment, _session: &Session) -> BoardResult<BlobHandle> {
        self.log.record(BackendCall::Upload { key: key.to_string() });
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BoardError::Other("storage unavailable".to_string()));
        }
        self.objects.lock().insert(key.to_string(), image.clone());
        Ok(BlobHandle {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        })
    }

    async fn public_url(&self, handle: &BlobHandle) -> BoardResult<String> {
        self.log.record(BackendCall::ResolveUrl { key: handle.key.clone() });
        if !self.objects.lock().contains_key(&handle.key) {
            return Err(BoardError::Other(format!("no object at {}", handle.key)));
        }
        Ok(format!("{}/blobs/{}", self.base_url, handle.key))
    }
}

pub struct MemoryPostStore {
    posts: Mutex<Vec<Post>>,
    log: CallLog,
    fail_inserts: AtomicBool,
    fail_queries: AtomicBool,
    insert_gate: Mutex<Option<Arc<Notify>>>,
    query_gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryPostStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            log,
            fail_inserts: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            insert_gate: Mutex::new(None),
            query_gate: Mutex::new(None),
        }
    }

    /// Seeds a post as if it had been written at `created_at`.
    pub fn seed(&self, title: &str, content: &str, author: &str, created_at: DateTime<Utc>) -> String {
        let id = Uuid::new_v4().to_string();
        self.posts.lock().push(Post {
            id: id.clone(),
            title: title.to_string(),
            content: content.to_string(),
            image_url: String::new(),
            created_at,
            author: author.to_string(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.posts.lock().len()
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Makes every following insert wait for one `notify_one` on the returned handle.
    pub fn hold_inserts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.insert_gate.lock() = Some(gate.clone());
        gate
    }

    /// Makes the next query read its rows, then wait for one `notify_one`
    /// before returning them. Later queries are not held.
    pub fn hold_next_query(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.query_gate.lock() = Some(gate.clone());
        gate
    }

    /// Server clock: never goes backwards, never repeats.
    fn next_timestamp(posts: &[Post]) -> DateTime<Utc> {
        let now = Utc::now();
        match posts.iter().map(|p| p.created_at).max() {
            Some(latest) if latest >= now => latest + Duration::microseconds(1),
            _ => now,
        }
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn insert(&self, record: &NewPost, _session: &Session) -> BoardResult<String> {
        self.log.record(BackendCall::Insert(record.clone()));
        let gate = self.insert_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(BoardError::Other("document store unavailable".to_string()));
        }
        let mut posts = self.posts.lock();
        let id = Uuid::new_v4().to_string();
        let created_at = Self::next_timestamp(&posts);
        posts.push(Post {
            id: id.clone(),
            title: record.title.clone(),
            content: record.content.clone(),
            image_url: record.image_url.clone(),
            created_at,
            author: record.author.clone(),
        });
        Ok(id)
    }

    async fn query_all(&self, order: PostOrder, _session: Option<&Session>) -> BoardResult<Vec<Post>> {
        self.log.record(BackendCall::Query);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(BoardError::Other("document store unavailable".to_string()));
        }
        let mut posts = self.posts.lock().clone();
        let gate = self.query_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        sort_posts(&mut posts, order);
        Ok(posts)
    }
}
