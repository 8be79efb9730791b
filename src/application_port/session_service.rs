use crate::domain_model::*;
use crate::domain_port::SessionStoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Failures surfaced by the session service.
///
/// The two token kinds never carry detail: callers (and attackers) must not
/// learn whether a signature, the algorithm or the stored hash was wrong.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<SessionStoreError> for AuthError {
    fn from(err: SessionStoreError) -> Self {
        AuthError::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access_token(
        &self,
        subject: &Subject,
        jti: Option<String>,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;
    async fn issue_refresh_token(
        &self,
        subject: &Subject,
        jti: String,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError>;
    async fn verify_access_token(&self, token: &AccessToken) -> Result<TokenClaims, AuthError>;
    async fn verify_refresh_token(&self, token: &RefreshToken) -> Result<TokenClaims, AuthError>;
    /// Signature and algorithm are checked, expiry is not: an access token
    /// presented alongside a refresh has usually lapsed already.
    async fn verify_access_pairing(&self, token: &AccessToken) -> Result<TokenClaims, AuthError>;
}

#[async_trait::async_trait]
pub trait TokenHasher: Send + Sync {
    async fn hash_token(&self, token: &str) -> Result<String, AuthError>;
    async fn verify_token(&self, token: &str, token_hash: &str) -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Issue a fresh pair for `subject` and replace its stored session.
    async fn create_session(&self, subject: &Subject) -> Result<TokenPair, AuthError>;
    /// Exchange a live refresh token for a new pair. The presented token is
    /// spent on success.
    async fn refresh_session(
        &self,
        refresh_token: &RefreshToken,
        access_token: Option<&AccessToken>,
    ) -> Result<TokenPair, AuthError>;
    /// Verify an access token presented on a protected request.
    async fn authenticate(&self, access_token: &AccessToken) -> Result<Subject, AuthError>;
}
