// src/handlers/feed_handlers.rs
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, web, HttpResponse};
use log::warn;
use serde::Serialize;

use crate::controller::feed::SubmitOutcome;
use crate::controller::view::FeedView;
use crate::error::SubmitError;
use crate::handlers::{failure, success};
use crate::AppState;

#[derive(Serialize)]
struct SubmitOut {
    id: Option<String>,
    reloaded: bool,
    feed: FeedView,
}

/// GET /api/feed
#[get("/feed")]
pub async fn get_feed(app_state: web::Data<AppState>) -> HttpResponse {
    success(StatusCode::OK, "Feed retrieved", app_state.feed.view())
}

/// POST /api/feed/refresh
#[post("/feed/refresh")]
pub async fn refresh_feed(app_state: web::Data<AppState>) -> HttpResponse {
    match app_state.feed.load_posts().await {
        Ok(count) => success(
            StatusCode::OK,
            &format!("{} posts loaded", count),
            app_state.feed.view(),
        ),
        Err(e) => failure(StatusCode::BAD_GATEWAY, format!("Failed to load posts: {}", e)),
    }
}

/// POST /api/posts
/// Submits the current draft.
#[post("/posts")]
pub async fn submit_post(app_state: web::Data<AppState>) -> HttpResponse {
    let feed = &app_state.feed;
    match feed.submit_post().await {
        Ok(SubmitOutcome::Posted { id, reloaded }) => success(
            StatusCode::CREATED,
            "Post created successfully",
            SubmitOut {
                id: Some(id),
                reloaded,
                feed: feed.view(),
            },
        ),
        Ok(SubmitOutcome::Skipped) => success(
            StatusCode::OK,
            "Title and content are required",
            SubmitOut {
                id: None,
                reloaded: false,
                feed: feed.view(),
            },
        ),
        Err(e) => {
            warn!("submit rejected: {}", e);
            let code = match &e {
                SubmitError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                SubmitError::InFlight => StatusCode::CONFLICT,
                SubmitError::Upload(_) | SubmitError::Write(_) => StatusCode::BAD_GATEWAY,
            };
            failure(code, e.to_string())
        }
    }
}

/// DELETE /api/notice
#[delete("/notice")]
pub async fn dismiss_notice(app_state: web::Data<AppState>) -> HttpResponse {
    app_state.feed.dismiss_notice();
    success(StatusCode::OK, "Notice dismissed", app_state.feed.view())
}

/// GET /blobs/{key}
/// Serves images held by the in-memory blob store.
#[get("/blobs/{key:.*}")]
pub async fn serve_blob(app_state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let key = path.into_inner();
    match app_state.local_blobs.as_ref().and_then(|b| b.get(&key)) {
        Some(image) => HttpResponse::Ok()
            .content_type(image.content_type)
            .body(image.bytes),
        None => failure(StatusCode::NOT_FOUND, "Image not found"),
    }
}
