use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

/// Process-local session store. Sessions do not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Subject, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn put_session(
        &self,
        subject: &Subject,
        token_hash: &str,
    ) -> Result<(), SessionStoreError> {
        self.sessions.insert(subject.clone(), token_hash.to_string());
        Ok(())
    }

    async fn get_session(
        &self,
        subject: &Subject,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        Ok(self.sessions.get(subject).map(|entry| SessionRecord {
            subject: subject.clone(),
            token_hash: entry.value().clone(),
        }))
    }
}
