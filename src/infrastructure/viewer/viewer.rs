use crate::core::UserId;
use crate::error::{AppError, AppResult};

/// Who is making the current request
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub user_id: Option<UserId>,
    /// Bearer token the identity came from, kept for sign-out
    pub session_token: Option<String>,
    pub request_id: String,
}

impl ViewerContext {
    pub fn authenticated(user_id: UserId, session_token: Option<String>, request_id: String) -> Self {
        Self {
            user_id: Some(user_id),
            session_token,
            request_id,
        }
    }

    pub fn unauthenticated(request_id: String) -> Self {
        Self {
            user_id: None,
            session_token: None,
            request_id,
        }
    }

    /// Shorthand for service calls made outside HTTP, e.g. tests and seeding
    pub fn for_user(user_id: UserId) -> Self {
        Self::authenticated(user_id, None, format!("local-{}", user_id))
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Identity for write paths; absence is an error
    pub fn require_user(&self) -> AppResult<UserId> {
        self.user_id
            .ok_or_else(|| AppError::Unauthenticated("Sign in to make changes".to_string()))
    }
}
