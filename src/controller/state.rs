// src/controller/state.rs
//! Feed UI state as a plain value with pure transitions.

use serde::Serialize;

use crate::models::draft::{Draft, ImageAttachment};
use crate::models::post::{sort_posts, Post, PostOrder};
use crate::models::session::Session;

pub const SIGN_IN_REQUIRED: &str = "Please sign in before writing a post.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Compose form hidden, sign-in prompt shown.
    Anonymous,
    /// Compose form shown.
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    SignInRequired,
    UploadFailed,
    WriteFailed,
    LoadFailed,
}

/// User-visible feedback waiting to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FeedAction {
    SessionChanged(Option<Session>),
    TitleEdited(String),
    ContentEdited(String),
    ImagePicked(Option<ImageAttachment>),
    SubmitRejected(Notice),
    SubmitStarted,
    SubmitSucceeded,
    SubmitFailed(Notice),
    LoadStarted,
    PostsLoaded { generation: u64, posts: Vec<Post> },
    LoadFailed { generation: u64, notice: Notice },
    NoticeDismissed,
}

/// Why a submit cannot start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotAuthenticated,
    InFlight,
    Blank,
}

/// Everything a submit needs, captured at the moment it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitPlan {
    pub session: Session,
    pub draft: Draft,
}

#[derive(Debug, Clone, Default)]
pub struct FeedState {
    pub session: Option<Session>,
    pub draft: Draft,
    pub posts: Vec<Post>,
    pub submitting: bool,
    pub loading: bool,
    pub notice: Option<Notice>,
    /// Generation of the most recently started load.
    pub load_generation: u64,
    /// Generation whose result the post list currently reflects.
    pub applied_generation: u64,
}

impl FeedState {
    pub fn mode(&self) -> FeedMode {
        match self.session {
            Some(_) => FeedMode::Authenticated,
            None => FeedMode::Anonymous,
        }
    }

    /// Starts a load and returns its generation. Results carrying an older
    /// generation than the one already applied are dropped.
    pub fn start_load(&mut self) -> u64 {
        self.apply(FeedAction::LoadStarted);
        self.load_generation
    }

    /// Accepts a finished load unless a newer one already landed.
    fn accept_load(&mut self, generation: u64) -> bool {
        if generation < self.applied_generation {
            return false;
        }
        self.applied_generation = generation;
        self.loading = generation < self.load_generation;
        true
    }

    /// Preconditions of a submit, checked in order: session, overlap, content.
    pub fn check_submit(&self) -> Result<SubmitPlan, Rejection> {
        let session = self.session.clone().ok_or(Rejection::NotAuthenticated)?;
        if self.submitting {
            return Err(Rejection::InFlight);
        }
        if !self.draft.is_postable() {
            return Err(Rejection::Blank);
        }
        Ok(SubmitPlan {
            session,
            draft: self.draft.clone(),
        })
    }

    pub fn apply(&mut self, action: FeedAction) {
        match action {
            FeedAction::SessionChanged(session) => {
                if session.is_some() && self.notice.as_ref().map(|n| n.kind) == Some(NoticeKind::SignInRequired) {
                    self.notice = None;
                }
                self.session = session;
            }
            FeedAction::TitleEdited(title) => self.draft.title = title,
            FeedAction::ContentEdited(content) => self.draft.content = content,
            FeedAction::ImagePicked(image) => self.draft.image = image,
            FeedAction::SubmitRejected(notice) => self.notice = Some(notice),
            FeedAction::SubmitStarted => {
                self.submitting = true;
                self.notice = None;
            }
            FeedAction::SubmitSucceeded => {
                self.submitting = false;
                self.draft = Draft::default();
            }
            FeedAction::SubmitFailed(notice) => {
                self.submitting = false;
                self.notice = Some(notice);
            }
            FeedAction::LoadStarted => {
                self.load_generation += 1;
                self.loading = true;
            }
            FeedAction::PostsLoaded { generation, mut posts } => {
                if self.accept_load(generation) {
                    sort_posts(&mut posts, PostOrder::newest_first());
                    self.posts = posts;
                }
            }
            FeedAction::LoadFailed { generation, notice } => {
                if self.accept_load(generation) {
                    self.notice = Some(notice);
                }
            }
            FeedAction::NoticeDismissed => self.notice = None,
        }
    }
}
