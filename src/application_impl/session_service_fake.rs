use crate::application_port::*;
use crate::domain_model::*;
use chrono::{Duration, Utc};

#[derive(Debug, Default)]
pub struct FakeSessionService;

impl FakeSessionService {
    pub fn new() -> Self {
        Self
    }
}

// Deterministic tokens for local runs against clients; nothing is stored,
// so refresh tokens are reusable.
#[async_trait::async_trait]
impl SessionService for FakeSessionService {
    async fn create_session(&self, subject: &Subject) -> Result<TokenPair, AuthError> {
        Ok(get_fake_pair(subject))
    }

    async fn refresh_session(
        &self,
        refresh_token: &RefreshToken,
        _access_token: Option<&AccessToken>,
    ) -> Result<TokenPair, AuthError> {
        match refresh_token.0.strip_prefix("fake-refresh-token:") {
            Some(subject) if !subject.is_empty() => Ok(get_fake_pair(&Subject::from(subject))),
            _ => Err(AuthError::TokenInvalid),
        }
    }

    async fn authenticate(&self, access_token: &AccessToken) -> Result<Subject, AuthError> {
        match access_token.0.strip_prefix("fake-access-token:") {
            Some(subject) if !subject.is_empty() => Ok(Subject::from(subject)),
            _ => Err(AuthError::TokenInvalid),
        }
    }
}

fn get_fake_pair(subject: &Subject) -> TokenPair {
    let now = Utc::now();
    TokenPair {
        access_token: AccessToken(format!("fake-access-token:{}", subject)),
        access_token_expires_at: now + Duration::minutes(5),
        refresh_token: RefreshToken(format!("fake-refresh-token:{}", subject)),
        refresh_token_expires_at: now + Duration::hours(1),
    }
}
