// AuthService - accounts, sessions and the token -> identity lookup behind every request

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{current_time_millis, UserId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::cache::SessionCache;
use crate::infrastructure::database::DatabaseInterface;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{AuthSession, Identity, User};

pub const MIN_PASSWORD_LEN: usize = 8;
const TOKEN_BYTES: usize = 32;

#[derive(Clone)]
pub struct AuthService {
    db: Arc<dyn DatabaseInterface>,
    ids: Arc<IdGenerator>,
    sessions: Arc<SessionCache>,
}

impl AuthService {
    pub fn new(db: Arc<dyn DatabaseInterface>, ids: Arc<IdGenerator>, sessions: Arc<SessionCache>) -> Self {
        Self { db, ids, sessions }
    }

    /// Create a password account and sign it in
    pub async fn sign_up(&self, username: &str, password: &str) -> AppResult<AuthSession> {
        let username = normalize_username(username)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let user = User {
            id: self.ids.next_id().into(),
            username: Some(username.clone()),
            password_hash: Some(hash_password(password)?),
            is_anonymous: false,
            created_at: current_time_millis(),
        };
        self.db.create_user(&user).await?;
        info!("Created user {} ({})", user.id, username);

        self.open_session(user.id).await
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> AppResult<AuthSession> {
        let username = normalize_username(username)?;
        let invalid = || AppError::Unauthenticated("Invalid username or password".to_string());

        let user = self.db.get_user_by_username(&username).await?.ok_or_else(invalid)?;
        let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
        if !verify_password(password, hash)? {
            warn!("Failed sign-in for {}", username);
            return Err(invalid());
        }

        self.open_session(user.id).await
    }

    /// A throwaway identity with no credentials
    pub async fn sign_in_anonymous(&self) -> AppResult<AuthSession> {
        let user = User {
            id: self.ids.next_id().into(),
            username: None,
            password_hash: None,
            is_anonymous: true,
            created_at: current_time_millis(),
        };
        self.db.create_user(&user).await?;
        info!("Created anonymous user {}", user.id);

        self.open_session(user.id).await
    }

    /// Ends the caller's session. Signing out twice is not an error.
    pub async fn sign_out(&self, vc: &ViewerContext) -> AppResult<()> {
        if let Some(token) = vc.session_token.as_deref() {
            self.sessions.evict(token).await;
            self.db.delete_session(token).await?;
        }
        Ok(())
    }

    pub async fn me(&self, vc: &ViewerContext) -> AppResult<Option<Identity>> {
        let Some(user_id) = vc.user_id else {
            return Ok(None);
        };
        Ok(self.db.get_user(user_id).await?.as_ref().map(Identity::from))
    }

    /// Token -> user, cache first
    pub async fn resolve_session(&self, token: &str) -> AppResult<Option<UserId>> {
        if let Some(user_id) = self.sessions.get(token).await {
            return Ok(Some(user_id));
        }
        let user_id = self.db.get_session_user(token).await?;
        if let Some(user_id) = user_id {
            self.sessions.insert(token, user_id).await;
        }
        Ok(user_id)
    }

    async fn open_session(&self, user_id: UserId) -> AppResult<AuthSession> {
        let token = new_session_token();
        self.db.create_session(&token, user_id, current_time_millis()).await?;
        self.sessions.insert(&token, user_id).await;
        Ok(AuthSession { token, user_id })
    }
}

fn normalize_username(username: &str) -> AppResult<String> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username must not be empty".to_string()));
    }
    Ok(username.to_lowercase())
}

fn new_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_password(password: &str) -> AppResult<String> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to encode salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is malformed: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite_database::SqliteDatabase;

    async fn service() -> AuthService {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        AuthService::new(
            db,
            Arc::new(IdGenerator::new(0).unwrap()),
            Arc::new(SessionCache::new(16)),
        )
    }

    #[test]
    fn tokens_are_url_safe_and_distinct() {
        let a = new_session_token();
        let b = new_session_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = service().await;
        let created = auth.sign_up("Ada", "analytical").await.unwrap();
        let again = auth.sign_in(" ada ", "analytical").await.unwrap();

        assert_eq!(created.user_id, again.user_id);
        assert_ne!(created.token, again.token);
        assert_eq!(auth.resolve_session(&again.token).await.unwrap(), Some(created.user_id));
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthenticated() {
        let auth = service().await;
        auth.sign_up("ada", "analytical").await.unwrap();

        assert!(matches!(auth.sign_in("ada", "nope-nope").await, Err(AppError::Unauthenticated(_))));
        assert!(matches!(auth.sign_in("grace", "analytical").await, Err(AppError::Unauthenticated(_))));
        assert!(matches!(auth.sign_up("ada", "analytical").await, Err(AppError::Conflict(_))));
        assert!(matches!(auth.sign_up("bob", "short").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn sign_out_invalidates_token() {
        let auth = service().await;
        let session = auth.sign_in_anonymous().await.unwrap();
        let vc = ViewerContext::authenticated(session.user_id, Some(session.token.clone()), "r".into());

        let me = auth.me(&vc).await.unwrap().unwrap();
        assert!(me.is_anonymous);

        auth.sign_out(&vc).await.unwrap();
        assert_eq!(auth.resolve_session(&session.token).await.unwrap(), None);
        auth.sign_out(&vc).await.unwrap();
    }
}
