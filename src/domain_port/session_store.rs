use crate::domain_model::*;

/// Persistence of the one live session per subject.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert the session of `subject`, replacing any previous hash.
    async fn put_session(&self, subject: &Subject, token_hash: &str)
    -> Result<(), SessionStoreError>;
    /// Fetch the session of `subject`. `Ok(None)` means no session was ever stored.
    async fn get_session(&self, subject: &Subject)
    -> Result<Option<SessionRecord>, SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("infra error: {0}")]
    Store(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
