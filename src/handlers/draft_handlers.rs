// src/handlers/draft_handlers.rs
use actix_web::http::StatusCode;
use actix_web::{delete, post, put, web, HttpResponse};
use base64::{engine::general_purpose, Engine as _};
use log::{debug, warn};

use crate::dtos::draft_dtos::{AttachImageIn, UpdateDraftIn};
use crate::error::{BoardError, BoardResult};
use crate::handlers::{failure, success};
use crate::models::draft::ImageAttachment;
use crate::AppState;

/// Only `image/*` is accepted, as the file picker does.
pub fn decode_image(body: &AttachImageIn) -> BoardResult<ImageAttachment> {
    let mime: mime::Mime = body
        .content_type
        .trim()
        .parse()
        .map_err(|_| BoardError::InvalidInput(format!("Invalid content type '{}'", body.content_type)))?;
    if mime.type_() != mime::IMAGE {
        return Err(BoardError::InvalidInput("Only image files can be attached".to_string()));
    }

    // strip a data URL prefix (data:image/png;base64,)
    let base64_data = match body.image_data.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => body.image_data.as_str(),
    };

    let bytes = general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|_| BoardError::InvalidInput("Invalid base64 image data".to_string()))?;
    if bytes.is_empty() {
        return Err(BoardError::InvalidInput("Image is empty".to_string()));
    }

    Ok(ImageAttachment {
        file_name: body.file_name.trim().to_string(),
        content_type: mime.essence_str().to_string(),
        bytes,
    })
}

/// PUT /api/draft
#[put("/draft")]
pub async fn update_draft(app_state: web::Data<AppState>, body: web::Json<UpdateDraftIn>) -> HttpResponse {
    let body = body.into_inner();
    if let Some(title) = body.title {
        app_state.feed.edit_title(title);
    }
    if let Some(content) = body.content {
        app_state.feed.edit_content(content);
    }
    success(StatusCode::OK, "Draft updated", app_state.feed.view())
}

/// POST /api/draft/image
#[post("/draft/image")]
pub async fn attach_image(app_state: web::Data<AppState>, body: web::Json<AttachImageIn>) -> HttpResponse {
    match decode_image(&body) {
        Ok(image) => {
            debug!("attached {} ({} bytes)", image.file_name, image.bytes.len());
            app_state.feed.attach_image(image);
            success(StatusCode::OK, "Image attached", app_state.feed.view())
        }
        Err(e) => {
            warn!("image rejected: {}", e);
            failure(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

/// DELETE /api/draft/image
#[delete("/draft/image")]
pub async fn remove_image(app_state: web::Data<AppState>) -> HttpResponse {
    app_state.feed.clear_image();
    success(StatusCode::OK, "Image removed", app_state.feed.view())
}
