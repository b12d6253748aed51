// src/controller/feed.rs
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::controller::state::{
    FeedAction, FeedState, Notice, NoticeKind, Rejection, SubmitPlan, SIGN_IN_REQUIRED,
};
use crate::controller::view::FeedView;
use crate::error::{BoardResult, SubmitError};
use crate::models::draft::ImageAttachment;
use crate::models::post::{NewPost, PostOrder};
use crate::models::session::Session;
use crate::repositories::blob_store::{new_image_key, BlobStore};
use crate::repositories::post_repository::PostStore;
use crate::services::identity::{IdentityService, SessionSubscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The record was written. `reloaded` is false when the follow-up fetch failed.
    Posted { id: String, reloaded: bool },
    /// Title or content was blank; nothing was sent.
    Skipped,
}

/// View-model of the board page: owns the draft and the post snapshot and
/// sequences the identity, blob and document services.
pub struct FeedController {
    state: Arc<Mutex<FeedState>>,
    identity: Arc<dyn IdentityService>,
    blobs: Arc<dyn BlobStore>,
    posts: Arc<dyn PostStore>,
    _subscription: SessionSubscription,
}

impl FeedController {
    /// Subscribes to session changes and performs the initial fetch.
    /// A failed fetch leaves an empty feed with a notice.
    pub async fn mount(
        identity: Arc<dyn IdentityService>,
        blobs: Arc<dyn BlobStore>,
        posts: Arc<dyn PostStore>,
    ) -> Self {
        let state = Arc::new(Mutex::new(FeedState::default()));

        let sink = state.clone();
        let subscription = identity.subscribe(Box::new(move |session| {
            sink.lock().apply(FeedAction::SessionChanged(session));
        }));

        let controller = Self {
            state,
            identity,
            blobs,
            posts,
            _subscription: subscription,
        };

        if let Err(e) = controller.load_posts().await {
            warn!("initial feed load failed: {}", e);
        }
        controller
    }

    fn apply(&self, action: FeedAction) {
        self.state.lock().apply(action);
    }

    pub fn snapshot(&self) -> FeedState {
        self.state.lock().clone()
    }

    pub fn view(&self) -> FeedView {
        FeedView::render(&self.state.lock())
    }

    pub fn on_session_changed(&self, session: Option<Session>) {
        self.apply(FeedAction::SessionChanged(session));
    }

    pub fn edit_title(&self, title: impl Into<String>) {
        self.apply(FeedAction::TitleEdited(title.into()));
    }

    pub fn edit_content(&self, content: impl Into<String>) {
        self.apply(FeedAction::ContentEdited(content.into()));
    }

    pub fn attach_image(&self, image: ImageAttachment) {
        self.apply(FeedAction::ImagePicked(Some(image)));
    }

    pub fn clear_image(&self) {
        self.apply(FeedAction::ImagePicked(None));
    }

    pub fn dismiss_notice(&self) {
        self.apply(FeedAction::NoticeDismissed);
    }

    /// Replaces the post list with the full collection, newest first.
    /// On failure the previous list stays and a notice is set. A result that
    /// finishes after a later load has already been applied is dropped.
    pub async fn load_posts(&self) -> BoardResult<usize> {
        let (generation, session) = {
            let mut state = self.state.lock();
            (state.start_load(), state.session.clone())
        };

        match self.posts.query_all(PostOrder::newest_first(), session.as_ref()).await {
            Ok(posts) => {
                let count = posts.len();
                debug!("feed loaded with {} posts", count);
                self.apply(FeedAction::PostsLoaded { generation, posts });
                Ok(count)
            }
            Err(e) => {
                error!("failed to load posts: {}", e);
                self.apply(FeedAction::LoadFailed {
                    generation,
                    notice: Notice::new(NoticeKind::LoadFailed, format!("Could not load posts: {}", e)),
                });
                Err(e)
            }
        }
    }

    /// Uploads the draft image if any, writes the post, clears the draft and
    /// reloads the feed.
    pub async fn submit_post(&self) -> Result<SubmitOutcome, SubmitError> {
        let plan = {
            let mut state = self.state.lock();
            match state.check_submit() {
                Ok(plan) => {
                    state.apply(FeedAction::SubmitStarted);
                    plan
                }
                Err(Rejection::NotAuthenticated) => {
                    state.apply(FeedAction::SubmitRejected(Notice::new(
                        NoticeKind::SignInRequired,
                        SIGN_IN_REQUIRED,
                    )));
                    return Err(SubmitError::NotAuthenticated);
                }
                Err(Rejection::InFlight) => return Err(SubmitError::InFlight),
                Err(Rejection::Blank) => {
                    debug!("blank title or content, nothing to submit");
                    return Ok(SubmitOutcome::Skipped);
                }
            }
        };

        let id = match self.write(&plan).await {
            Ok(id) => id,
            Err(e) => {
                let notice = match &e {
                    SubmitError::Upload(_) => Notice::new(NoticeKind::UploadFailed, e.to_string()),
                    _ => Notice::new(NoticeKind::WriteFailed, e.to_string()),
                };
                error!("submit failed: {}", e);
                self.apply(FeedAction::SubmitFailed(notice));
                return Err(e);
            }
        };

        info!("post {} written by {}", id, plan.session.author());
        self.apply(FeedAction::SubmitSucceeded);

        let reloaded = self.load_posts().await.is_ok();
        Ok(SubmitOutcome::Posted { id, reloaded })
    }

    async fn write(&self, plan: &SubmitPlan) -> Result<String, SubmitError> {
        let image_url = match &plan.draft.image {
            Some(image) => {
                let key = new_image_key();
                let handle = self
                    .blobs
                    .put(&key, image, &plan.session)
                    .await
                    .map_err(SubmitError::Upload)?;
                self.blobs
                    .public_url(&handle)
                    .await
                    .map_err(SubmitError::Upload)?
            }
            None => String::new(),
        };

        let record = NewPost {
            title: plan.draft.title.clone(),
            content: plan.draft.content.clone(),
            image_url,
            author: plan.session.author(),
        };

        self.posts
            .insert(&record, &plan.session)
            .await
            .map_err(SubmitError::Write)
    }

    /// Asks the identity service to end the session. The state change
    /// arrives through the subscription.
    pub async fn logout(&self) -> BoardResult<()> {
        self.identity.end_session().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::state::FeedMode;
    use crate::repositories::memory::{BackendCall, CallLog, MemoryBlobStore, MemoryPostStore};
    use crate::services::identity::LocalIdentity;
    use chrono::{TimeZone, Utc};

    struct Harness {
        identity: Arc<LocalIdentity>,
        blobs: Arc<MemoryBlobStore>,
        posts: Arc<MemoryPostStore>,
        log: CallLog,
        controller: FeedController,
    }

    async fn harness() -> Harness {
        let log = CallLog::default();
        let identity = Arc::new(LocalIdentity::new());
        let blobs = Arc::new(MemoryBlobStore::new("http://board.test", "board", log.clone()));
        let posts = Arc::new(MemoryPostStore::new(log.clone()));
        let controller = FeedController::mount(identity.clone(), blobs.clone(), posts.clone()).await;
        log.clear();
        Harness {
            identity,
            blobs,
            posts,
            log,
            controller,
        }
    }

    async fn sign_in(h: &Harness) {
        h.identity.sign_in("a@b.com", "secret1").await.unwrap();
    }

    fn png() -> ImageAttachment {
        ImageAttachment {
            file_name: "cat.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn mount_fetches_posts_and_tracks_session() {
        let log = CallLog::default();
        let identity = Arc::new(LocalIdentity::new());
        let blobs = Arc::new(MemoryBlobStore::new("http://board.test", "board", log.clone()));
        let posts = Arc::new(MemoryPostStore::new(log.clone()));
        posts.seed("hello", "first", "x@y.com", Utc.timestamp_opt(10, 0).unwrap());

        let controller = FeedController::mount(identity.clone(), blobs, posts).await;
        assert_eq!(log.calls(), vec![BackendCall::Query]);
        assert_eq!(controller.snapshot().posts.len(), 1);
        assert_eq!(controller.snapshot().mode(), FeedMode::Anonymous);

        identity.sign_in("a@b.com", "secret1").await.unwrap();
        assert_eq!(controller.snapshot().mode(), FeedMode::Authenticated);
    }

    #[tokio::test]
    async fn anonymous_submit_notifies_and_calls_nothing() {
        let h = harness().await;
        h.controller.edit_title("Hi");
        h.controller.edit_content("World");
        h.controller.attach_image(png());

        let err = h.controller.submit_post().await.unwrap_err();
        assert!(matches!(err, SubmitError::NotAuthenticated));
        assert!(h.log.calls().is_empty());

        let state = h.controller.snapshot();
        assert_eq!(state.notice.map(|n| n.kind), Some(NoticeKind::SignInRequired));
        assert_eq!(state.draft.title, "Hi");
    }

    #[tokio::test]
    async fn blank_drafts_never_upload_or_write() {
        let h = harness().await;
        sign_in(&h).await;
        let cases = [("", "World"), ("Hi", ""), ("  ", "World"), ("Hi", " \n\t"), ("", "")];
        for (title, content) in cases {
            h.controller.edit_title(title);
            h.controller.edit_content(content);
            h.controller.attach_image(png());
            let outcome = h.controller.submit_post().await.unwrap();
            assert_eq!(outcome, SubmitOutcome::Skipped);
        }
        assert!(h.log.calls().is_empty());
        assert_eq!(h.posts.len(), 0);
    }

    #[tokio::test]
    async fn text_only_post_is_written_then_reloaded() {
        let h = harness().await;
        sign_in(&h).await;
        h.controller.edit_title("Hi");
        h.controller.edit_content("World");

        let outcome = h.controller.submit_post().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Posted { reloaded: true, .. }));

        let expected = NewPost {
            title: "Hi".to_string(),
            content: "World".to_string(),
            image_url: String::new(),
            author: "a@b.com".to_string(),
        };
        assert_eq!(h.log.calls(), vec![BackendCall::Insert(expected), BackendCall::Query]);

        let state = h.controller.snapshot();
        assert!(state.draft.is_empty());
        assert_eq!(state.posts.len(), 1);
        assert_eq!(state.posts[0].author, "a@b.com");
        assert_eq!(state.posts[0].image_url, "");
    }

    #[tokio::test]
    async fn image_is_uploaded_before_the_write() {
        let h = harness().await;
        sign_in(&h).await;
        h.controller.edit_title("Cat");
        h.controller.edit_content("look");
        h.controller.attach_image(png());

        h.controller.submit_post().await.unwrap();

        let calls = h.log.calls();
        assert_eq!(calls.len(), 4);
        let key = match &calls[0] {
            BackendCall::Upload { key } => key.clone(),
            other => panic!("expected upload first, got {:?}", other),
        };
        assert!(key.starts_with("images/"));
        assert_eq!(calls[1], BackendCall::ResolveUrl { key: key.clone() });
        match &calls[2] {
            BackendCall::Insert(record) => {
                assert_eq!(record.image_url, format!("http://board.test/blobs/{}", key))
            }
            other => panic!("expected insert, got {:?}", other),
        }
        assert_eq!(calls[3], BackendCall::Query);
        assert_eq!(h.blobs.get(&key), Some(png()));
        assert!(h.controller.snapshot().draft.is_empty());
    }

    #[tokio::test]
    async fn failed_upload_keeps_draft_and_skips_write() {
        let h = harness().await;
        sign_in(&h).await;
        h.blobs.fail_uploads(true);
        h.controller.edit_title("Cat");
        h.controller.edit_content("look");
        h.controller.attach_image(png());

        let err = h.controller.submit_post().await.unwrap_err();
        assert!(matches!(err, SubmitError::Upload(_)));
        assert_eq!(h.posts.len(), 0);

        let state = h.controller.snapshot();
        assert!(!state.submitting);
        assert_eq!(state.draft.title, "Cat");
        assert!(state.draft.image.is_some());
        assert_eq!(state.notice.map(|n| n.kind), Some(NoticeKind::UploadFailed));
    }

    #[tokio::test]
    async fn failed_write_keeps_draft() {
        let h = harness().await;
        sign_in(&h).await;
        h.posts.fail_inserts(true);
        h.controller.edit_title("Hi");
        h.controller.edit_content("World");

        let err = h.controller.submit_post().await.unwrap_err();
        assert!(matches!(err, SubmitError::Write(_)));
        let state = h.controller.snapshot();
        assert_eq!(state.draft.content, "World");
        assert_eq!(state.notice.map(|n| n.kind), Some(NoticeKind::WriteFailed));
        assert!(!h.log.calls().contains(&BackendCall::Query));
    }

    #[tokio::test]
    async fn failed_reload_still_counts_as_posted() {
        let h = harness().await;
        sign_in(&h).await;
        h.posts.fail_queries(true);
        h.controller.edit_title("Hi");
        h.controller.edit_content("World");

        let outcome = h.controller.submit_post().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Posted { reloaded: false, .. }));
        let state = h.controller.snapshot();
        assert!(state.draft.is_empty());
        assert_eq!(state.notice.map(|n| n.kind), Some(NoticeKind::LoadFailed));
    }

    #[tokio::test]
    async fn overlapping_submit_is_rejected() {
        let h = harness().await;
        sign_in(&h).await;
        let gate = h.posts.hold_inserts();
        h.controller.edit_title("Hi");
        h.controller.edit_content("World");

        let second = async {
            while !h.controller.snapshot().submitting {
                tokio::task::yield_now().await;
            }
            let result = h.controller.submit_post().await;
            gate.notify_one();
            result
        };
        let (first, second) = tokio::join!(h.controller.submit_post(), second);

        assert!(matches!(first, Ok(SubmitOutcome::Posted { .. })));
        assert!(matches!(second, Err(SubmitError::InFlight)));
        assert_eq!(h.posts.len(), 1);
    }

    #[tokio::test]
    async fn slow_refresh_does_not_hide_a_new_post() {
        let h = harness().await;
        sign_in(&h).await;
        let gate = h.posts.hold_next_query();
        h.controller.edit_title("Hi");
        h.controller.edit_content("World");

        let submit = async {
            while !h.log.calls().contains(&BackendCall::Query) {
                tokio::task::yield_now().await;
            }
            let outcome = h.controller.submit_post().await;
            gate.notify_one();
            outcome
        };
        let (refresh, outcome) = tokio::join!(h.controller.load_posts(), submit);

        assert!(refresh.is_ok());
        assert!(matches!(outcome, Ok(SubmitOutcome::Posted { reloaded: true, .. })));
        let state = h.controller.snapshot();
        assert_eq!(state.posts.len(), 1);
        assert_eq!(state.posts[0].title, "Hi");
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn feed_is_newest_first() {
        let h = harness().await;
        h.posts.seed("t1", "c", "a@b.com", Utc.timestamp_opt(100, 0).unwrap());
        h.posts.seed("t3", "c", "a@b.com", Utc.timestamp_opt(300, 0).unwrap());
        h.posts.seed("t2", "c", "a@b.com", Utc.timestamp_opt(200, 0).unwrap());

        assert_eq!(h.controller.load_posts().await.unwrap(), 3);
        let titles: Vec<String> = h.controller.snapshot().posts.into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["t3", "t2", "t1"]);
    }

    #[tokio::test]
    async fn logout_returns_to_anonymous() {
        let h = harness().await;
        sign_in(&h).await;
        assert_eq!(h.controller.snapshot().mode(), FeedMode::Authenticated);
        h.controller.logout().await.unwrap();
        assert_eq!(h.controller.snapshot().mode(), FeedMode::Anonymous);
    }

    #[tokio::test]
    async fn dropping_controller_releases_subscription() {
        let h = harness().await;
        assert_eq!(h.identity.hub().listener_count(), 1);
        let Harness { identity, controller, .. } = h;
        drop(controller);
        assert_eq!(identity.hub().listener_count(), 0);
    }
}
