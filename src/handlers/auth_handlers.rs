use actix_web::http::StatusCode;
use actix_web::{post, web, HttpResponse};
use log::{info, warn};
use regex::Regex;

use crate::dtos::auth::{LoginIn, RestoreSessionIn, SessionOut};
use crate::handlers::{failure, success};
use crate::models::session::Session;
use crate::AppState;

fn looks_like_email(email: &str) -> bool {
    let re = Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("static regex");
    re.is_match(email)
}

fn session_out(session: Session) -> SessionOut {
    SessionOut {
        user_id: session.user_id,
        email: session.email,
    }
}

/// POST /auth/login
/// Forwards the login view's credentials to the identity service.
#[post("/login")]
pub async fn login(app_state: web::Data<AppState>, body: web::Json<LoginIn>) -> HttpResponse {
    let email = body.email.trim().to_lowercase();

    if !looks_like_email(&email) {
        return failure(StatusCode::BAD_REQUEST, "Invalid email format");
    }
    if body.password.len() < 6 {
        return failure(StatusCode::BAD_REQUEST, "Password must be at least 6 characters long");
    }

    match app_state.identity.sign_in(&email, &body.password).await {
        Ok(session) => {
            info!("signed in as {}", session.author());
            success(StatusCode::OK, "Login successful", session_out(session))
        }
        Err(e) => {
            warn!("login failed: {}", e);
            failure(StatusCode::UNAUTHORIZED, "Invalid email or password")
        }
    }
}

/// POST /auth/session
/// Adopts an access token obtained elsewhere.
#[post("/session")]
pub async fn restore_session(
    app_state: web::Data<AppState>,
    body: web::Json<RestoreSessionIn>,
) -> HttpResponse {
    match app_state.identity.restore(&body.access_token).await {
        Ok(session) => success(StatusCode::OK, "Session restored", session_out(session)),
        Err(e) => {
            warn!("session restore failed: {}", e);
            failure(StatusCode::UNAUTHORIZED, "Invalid token")
        }
    }
}

/// POST /auth/logout
#[post("/logout")]
pub async fn logout(app_state: web::Data<AppState>) -> HttpResponse {
    match app_state.feed.logout().await {
        Ok(()) => success(StatusCode::OK, "Logged out", app_state.feed.view()),
        // the local session is gone either way
        Err(e) => success(
            StatusCode::OK,
            &format!("Logged out locally ({})", e),
            app_state.feed.view(),
        ),
    }
}
