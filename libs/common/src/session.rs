//! Session context for the signed-in operator
//!
//! The session is an explicit value owned by whoever drives the dashboard;
//! nothing here is global. Its lifecycle is
//! `Uninitialized -> (init) -> Active | Anonymous -> (login) -> Active -> (logout) -> Cleared`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    http::ApiClient,
};

/// Role of a dashboard account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Staff,
}

impl UserRole {
    /// Get the role name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Staff => "staff",
        }
    }
}

/// The signed-in user as reported by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: UserRole,
}

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// `init` has not run yet
    Uninitialized,
    /// No usable token was found
    Anonymous,
    /// A token is held and has not expired
    Active,
    /// The operator logged out
    Cleared,
}

/// Request body for `POST /auth/login`
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response body for `POST /auth/login`
#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: Option<String>,
    user: AuthUser,
}

/// What gets written to the token file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    user: AuthUser,
}

/// Only the expiry is read from the token; the API stays the authority
#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: i64,
}

/// Session context for one operator
#[derive(Debug)]
pub struct SessionContext {
    token_path: PathBuf,
    state: SessionState,
    session: Option<StoredSession>,
}

impl SessionContext {
    /// Create a session context persisting to `token_path`
    pub fn new(token_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
            state: SessionState::Uninitialized,
            session: None,
        }
    }

    /// Load the persisted token, discarding it when expired or unreadable
    pub async fn init(&mut self) -> ApiResult<SessionState> {
        let contents = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No persisted session found");
                return Ok(self.become_anonymous());
            }
            Err(e) => {
                return Err(ApiError::Session(format!(
                    "Failed to read {}: {}",
                    self.token_path.display(),
                    e
                )));
            }
        };

        let stored: StoredSession = match serde_json::from_str(&contents) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Discarding unreadable session file: {}", e);
                remove_file(&self.token_path).await?;
                return Ok(self.become_anonymous());
            }
        };

        match token_expiry(&stored.token) {
            Ok(expiry) if expiry > Utc::now() => {
                info!("Restored session for {}", stored.user.username);
                self.session = Some(stored);
                self.state = SessionState::Active;
            }
            Ok(_) => {
                info!("Persisted session for {} has expired", stored.user.username);
                remove_file(&self.token_path).await?;
                self.become_anonymous();
            }
            Err(e) => {
                warn!("Discarding persisted session: {}", e);
                remove_file(&self.token_path).await?;
                self.become_anonymous();
            }
        }

        Ok(self.state)
    }

    /// Authenticate against the API and persist the returned token
    pub async fn login(
        &mut self,
        client: &ApiClient,
        username: &str,
        password: &str,
    ) -> ApiResult<&AuthUser> {
        info!("Login attempt for user: {}", username);

        let response: LoginResponse = client
            .post_json("auth/login", &LoginRequest { username, password })
            .await?;

        let stored = StoredSession {
            token: response.access_token,
            user: response.user,
        };
        self.persist(&stored).await?;

        info!("Logged in as {} ({})", stored.user.username, stored.user.role.as_str());
        self.state = SessionState::Active;
        let session = self.session.insert(stored);
        Ok(&session.user)
    }

    /// Tell the API the token is no longer used and forget it locally
    pub async fn logout(&mut self, client: &ApiClient) -> ApiResult<()> {
        if let Some(stored) = self.session.take() {
            let authed = client.clone().with_token(stored.token);
            if let Err(e) = authed.post_empty("auth/logout", &serde_json::json!({})).await {
                warn!("Server-side logout failed, clearing local session anyway: {}", e);
            }
            info!("Logged out {}", stored.user.username);
        }

        remove_file(&self.token_path).await?;
        self.state = SessionState::Cleared;
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a token is held
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }

    /// The bearer token, if any
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    /// The bearer token, or `Unauthorized` when signed out
    pub fn require_token(&self) -> ApiResult<&str> {
        match (&self.state, &self.session) {
            (SessionState::Active, Some(stored)) => Ok(&stored.token),
            _ => Err(ApiError::Unauthorized),
        }
    }

    /// A copy of `client` carrying this session's token
    pub fn authorize(&self, client: &ApiClient) -> ApiResult<ApiClient> {
        let token = self.require_token()?;
        Ok(client.clone().with_token(token))
    }

    fn become_anonymous(&mut self) -> SessionState {
        self.session = None;
        self.state = SessionState::Anonymous;
        self.state
    }

    async fn persist(&self, stored: &StoredSession) -> ApiResult<()> {
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ApiError::Session(format!("Failed to create {}: {}", parent.display(), e)))?;
            }
        }

        let contents =
            serde_json::to_string_pretty(stored).map_err(|e| ApiError::Session(e.to_string()))?;
        tokio::fs::write(&self.token_path, contents)
            .await
            .map_err(|e| {
                ApiError::Session(format!("Failed to write {}: {}", self.token_path.display(), e))
            })
    }
}

/// Read the `exp` claim of a JWT without checking its signature
pub fn token_expiry(token: &str) -> ApiResult<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| ApiError::Session(format!("Malformed token: {}", e)))?;

    DateTime::from_timestamp(data.claims.exp, 0)
        .ok_or_else(|| ApiError::Session(format!("Token expiry out of range: {}", data.claims.exp)))
}

async fn remove_file(path: &Path) -> ApiResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ApiError::Session(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};

    pub(crate) fn make_token(exp: DateTime<Utc>) -> String {
        encode(
            &Header::default(),
            &serde_json::json!({ "sub": "1", "exp": exp.timestamp() }),
            &EncodingKey::from_secret(b"any-secret"),
        )
        .expect("token")
    }

    fn admin() -> AuthUser {
        AuthUser {
            id: 1,
            username: "admin".to_string(),
            email: "admin@clinic.test".to_string(),
            full_name: Some("Clinic Admin".to_string()),
            role: UserRole::Admin,
        }
    }

    async fn write_session(path: &Path, token: String) {
        let stored = StoredSession {
            token,
            user: admin(),
        };
        tokio::fs::write(path, serde_json::to_string(&stored).expect("json"))
            .await
            .expect("write");
    }

    #[test]
    fn test_token_expiry_reads_exp_claim() {
        let exp = DateTime::from_timestamp(Utc::now().timestamp() + 3600, 0).expect("ts");
        assert_eq!(token_expiry(&make_token(exp)).expect("expiry"), exp);
        assert!(token_expiry("not-a-jwt").is_err());
    }

    #[tokio::test]
    async fn test_init_without_file_is_anonymous() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = SessionContext::new(dir.path().join("session.json"));
        assert_eq!(session.state(), SessionState::Uninitialized);

        assert_eq!(session.init().await.expect("init"), SessionState::Anonymous);
        assert!(session.current_user().is_none());
        assert!(matches!(session.require_token(), Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_init_restores_unexpired_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let token = make_token(Utc::now() + Duration::hours(1));
        write_session(&path, token.clone()).await;

        let mut session = SessionContext::new(&path);
        assert_eq!(session.init().await.expect("init"), SessionState::Active);
        assert_eq!(session.require_token().expect("token"), token);
        assert_eq!(session.current_user().map(|u| u.username.as_str()), Some("admin"));
    }

    #[tokio::test]
    async fn test_init_discards_expired_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        write_session(&path, make_token(Utc::now() - Duration::minutes(5))).await;

        let mut session = SessionContext::new(&path);
        assert_eq!(session.init().await.expect("init"), SessionState::Anonymous);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_init_discards_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "{not json").await.expect("write");

        let mut session = SessionContext::new(&path);
        assert_eq!(session.init().await.expect("init"), SessionState::Anonymous);
        assert!(!path.exists());
    }
}
