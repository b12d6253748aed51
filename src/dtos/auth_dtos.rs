use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct LoginIn {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RestoreSessionIn {
    pub access_token: String,
}

/// GoTrue password-grant response.
#[derive(Debug, Deserialize)]
pub struct TokenResp {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub user: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: Option<String>,
}

/// What the page learns about the signed-in user. Tokens stay server-side.
#[derive(Debug, Serialize)]
pub struct SessionOut {
    pub user_id: String,
    pub email: Option<String>,
}
