pub mod auth_handlers;
pub mod draft_handlers;
pub mod feed_handlers;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

pub fn success<T: Serialize>(code: StatusCode, message: &str, data: T) -> HttpResponse {
    HttpResponse::build(code).json(ApiResponse {
        status: "success".to_string(),
        message: message.to_string(),
        data: Some(data),
    })
}

pub fn failure(code: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(code).json(ApiResponse::<()> {
        status: "error".to_string(),
        message: message.into(),
        data: None,
    })
}
