// src/controller/view.rs
use serde::Serialize;

use crate::controller::state::{FeedMode, FeedState, Notice};
use crate::dtos::post_dtos::PostOut;
use crate::models::post::Post;

/// Client-side routes the page links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Feed,
    Login,
    PostDetail(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Feed => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::PostDetail(id) => format!("/post/{}", urlencoding::encode(id)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DraftView {
    pub title: String,
    pub content: String,
    pub image_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ComposeView {
    pub enabled: bool,
    pub draft: DraftView,
}

/// What the page renders for the current state.
#[derive(Debug, Serialize)]
pub struct FeedView {
    pub mode: FeedMode,
    /// Shown in the header while signed in.
    pub signed_in_as: Option<String>,
    /// Present only while signed in.
    pub compose: Option<ComposeView>,
    /// Sign-in link shown instead of the form.
    pub login_href: Option<String>,
    pub notice: Option<Notice>,
    pub loading: bool,
    pub posts: Vec<PostOut>,
}

impl FeedView {
    pub fn render(state: &FeedState) -> Self {
        let compose = state.session.as_ref().map(|_| ComposeView {
            enabled: !state.submitting,
            draft: DraftView {
                title: state.draft.title.clone(),
                content: state.draft.content.clone(),
                image_name: state.draft.image.as_ref().map(|i| i.file_name.clone()),
            },
        });

        Self {
            mode: state.mode(),
            signed_in_as: state
                .session
                .as_ref()
                .map(|s| s.author()),
            login_href: match state.mode() {
                FeedMode::Anonymous => Some(Route::Login.path()),
                FeedMode::Authenticated => None,
            },
            compose,
            notice: state.notice.clone(),
            loading: state.loading,
            posts: state.posts.iter().map(post_out).collect(),
        }
    }
}

fn post_out(post: &Post) -> PostOut {
    PostOut {
        id: post.id.clone(),
        title: post.title.clone(),
        content: post.content.clone(),
        image_url: post.image_url.clone(),
        author: post.author.clone(),
        created_at: post.created_at,
        created_on: post.created_at.format("%Y-%m-%d").to_string(),
        href: Route::PostDetail(post.id.clone()).path(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::state::FeedAction;
    use crate::models::session::Session;
    use chrono::{TimeZone, Utc};

    #[test]
    fn anonymous_page_has_no_form() {
        let view = FeedView::render(&FeedState::default());
        assert_eq!(view.mode, FeedMode::Anonymous);
        assert!(view.compose.is_none());
        assert!(view.signed_in_as.is_none());
        assert_eq!(view.login_href.as_deref(), Some("/login"));
    }

    #[test]
    fn signing_in_shows_enabled_form_and_email() {
        let mut state = FeedState::default();
        assert!(FeedView::render(&state).compose.is_none());

        state.apply(FeedAction::SessionChanged(Some(Session::new("u1", Some("a@b.com".into())))));
        let view = FeedView::render(&state);
        assert_eq!(view.mode, FeedMode::Authenticated);
        assert!(view.compose.as_ref().unwrap().enabled);
        assert_eq!(view.signed_in_as.as_deref(), Some("a@b.com"));
        assert!(view.login_href.is_none());
    }

    #[test]
    fn form_is_disabled_while_submitting() {
        let mut state = FeedState::default();
        state.apply(FeedAction::SessionChanged(Some(Session::new("u1", None))));
        state.apply(FeedAction::SubmitStarted);
        let view = FeedView::render(&state);
        assert!(!view.compose.unwrap().enabled);
        assert_eq!(view.signed_in_as.as_deref(), Some("u1"));
    }

    #[test]
    fn blank_email_shows_user_id() {
        let mut state = FeedState::default();
        state.apply(FeedAction::SessionChanged(Some(Session::new("u1", Some("  ".into())))));
        assert_eq!(FeedView::render(&state).signed_in_as.as_deref(), Some("u1"));
        state.apply(FeedAction::SessionChanged(Some(Session::new("u2", Some(String::new())))));
        assert_eq!(FeedView::render(&state).signed_in_as.as_deref(), Some("u2"));
    }

    #[test]
    fn posts_link_to_detail_route() {
        let mut state = FeedState::default();
        let generation = state.start_load();
        state.apply(FeedAction::PostsLoaded {
            generation,
            posts: vec![Post {
                id: "abc-1".to_string(),
                title: "Hi".to_string(),
                content: "World".to_string(),
                image_url: String::new(),
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
                author: "a@b.com".to_string(),
            }],
        });
        let view = FeedView::render(&state);
        assert_eq!(view.posts[0].href, "/post/abc-1");
        assert_eq!(view.posts[0].created_on, "2024-05-01");
    }

    #[test]
    fn routes() {
        assert_eq!(Route::Feed.path(), "/");
        assert_eq!(Route::PostDetail("a b".into()).path(), "/post/a%20b");
    }
}
