// src/services/auth_services.rs
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::config::SupabaseConfig;
use crate::dtos::auth::{TokenResp, UserInfo};
use crate::error::{BoardError, BoardResult};
use crate::models::session::{JwtClaims, Session};
use crate::services::identity::{IdentityService, SessionHub, SessionListener, SessionSubscription};

/// Supabase GoTrue as the identity service.
#[derive(Clone)]
pub struct AuthService {
    pub client: Client,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub jwt_secret: Option<String>,
    hub: SessionHub,
}

impl AuthService {
    pub fn new(client: Client, cfg: &SupabaseConfig) -> Self {
        Self {
            client,
            supabase_url: cfg.url.trim_end_matches('/').to_string(),
            supabase_anon_key: cfg.anon_key.clone(),
            jwt_secret: cfg.jwt_secret.clone(),
            hub: SessionHub::new(),
        }
    }

    /// Turns an access token into a session. With the project's JWT secret
    /// the token is verified locally; without it the auth server vouches for
    /// the token through `/auth/v1/user`.
    pub async fn verify_token(&self, access_token: &str) -> BoardResult<Session> {
        match &self.jwt_secret {
            Some(secret) => session_from_token(secret, access_token),
            None => self.fetch_user(access_token).await,
        }
    }

    async fn fetch_user(&self, access_token: &str) -> BoardResult<Session> {
        let url = format!("{}/auth/v1/user", self.supabase_url);
        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.supabase_anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BoardError::Supabase(format!("token rejected: {} {}", status, body)));
        }

        let user: UserInfo = resp.json().await?;
        Ok(Session::new(user.id, user.email.filter(|e| !e.is_empty())).with_access_token(access_token))
    }
}

/// Verifies an HS256 Supabase access token and reads its claims.
pub fn session_from_token(secret: &str, access_token: &str) -> BoardResult<Session> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&["authenticated"]);
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<JwtClaims>(access_token, &key, &validation)?;
    Ok(data.claims.into_session(access_token))
}

#[async_trait]
impl IdentityService for AuthService {
    fn current_session(&self) -> Option<Session> {
        self.hub.current()
    }

    fn subscribe(&self, listener: SessionListener) -> SessionSubscription {
        self.hub.subscribe(listener)
    }

    async fn sign_in(&self, email: &str, password: &str) -> BoardResult<Session> {
        #[derive(Serialize)]
        struct LoginBody<'a> {
            email: &'a str,
            password: &'a str,
        }

        let url = format!("{}/auth/v1/token?grant_type=password", self.supabase_url);

        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.supabase_anon_key)
            .header("Content-Type", "application/json")
            .json(&LoginBody {
                email: email.trim(),
                password,
            })
            .send()
            .await?;

        let status = resp.status();
        let txt = resp.text().await.unwrap_or_default();

        if status != StatusCode::OK {
            if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&txt) {
                if let Some(msg) = error_json
                    .get("error_description")
                    .or_else(|| error_json.get("msg"))
                    .and_then(|m| m.as_str())
                {
                    return Err(BoardError::Supabase(msg.to_string()));
                }
            }
            return Err(BoardError::Supabase(format!("login failed: {} {}", status, txt)));
        }

        let tr: TokenResp = serde_json::from_str(&txt)?;
        debug!(
            "token grant ok (type {:?}, expires in {:?}s, refresh token: {})",
            tr.token_type,
            tr.expires_in,
            tr.refresh_token.is_some()
        );

        let session = match tr.user {
            Some(user) => Session::new(user.id, user.email.filter(|e| !e.is_empty()))
                .with_access_token(&tr.access_token),
            None => self.verify_token(&tr.access_token).await?,
        };

        self.hub.publish(Some(session.clone()));
        Ok(session)
    }

    async fn restore(&self, access_token: &str) -> BoardResult<Session> {
        let session = self.verify_token(access_token.trim()).await?;
        self.hub.publish(Some(session.clone()));
        Ok(session)
    }

    async fn end_session(&self) -> BoardResult<()> {
        let token = self.hub.current().and_then(|s| s.access_token);

        // The local session ends even if the remote revoke fails.
        let result = match token {
            Some(token) => {
                let url = format!("{}/auth/v1/logout", self.supabase_url);
                match self
                    .client
                    .post(&url)
                    .header("apikey", &self.supabase_anon_key)
                    .header("Authorization", format!("Bearer {}", token))
                    .send()
                    .await
                {
                    Ok(resp) if resp.status().is_success() => Ok(()),
                    Ok(resp) => {
                        let status = resp.status();
                        let body = resp.text().await.unwrap_or_default();
                        Err(BoardError::Supabase(format!("logout failed: {} {}", status, body)))
                    }
                    Err(e) => Err(BoardError::Http(e)),
                }
            }
            None => Ok(()),
        };

        if let Err(e) = &result {
            warn!("remote logout failed: {}", e);
        }
        self.hub.publish(None);
        result
    }
}
