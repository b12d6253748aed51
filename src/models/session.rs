use serde::{Deserialize, Serialize};

/// Authenticated identity as reported by the identity service.
/// Absent (`None`) while logged out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    /// Bearer token for calls made on the user's behalf. Never rendered.
    #[serde(skip_serializing, default)]
    pub access_token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Author stamped on new posts: the email, else the user id.
    pub fn author(&self) -> String {
        self.email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(&self.user_id)
            .to_string()
    }
}

/// Claims carried in a Supabase access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// subject / user id
    pub sub: String,
    pub aud: Option<String>,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
    pub role: Option<String>,
    pub email: Option<String>,
}

impl JwtClaims {
    pub fn into_session(self, access_token: &str) -> Session {
        Session::new(self.sub, self.email.filter(|e| !e.is_empty()))
            .with_access_token(access_token)
    }
}
