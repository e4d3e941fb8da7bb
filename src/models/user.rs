use serde::Serialize;

use crate::core::UserId;

/// A stored account. Anonymous users have neither username nor password.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub is_anonymous: bool,
    pub created_at: i64,
}

/// What the client learns about itself
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub is_anonymous: bool,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_anonymous: user.is_anonymous,
        }
    }
}

/// Issued on sign-up and sign-in
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    pub user_id: UserId,
}
