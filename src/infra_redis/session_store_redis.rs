use crate::domain_model::*;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Sessions as plain string keys `<prefix>:<subject>`.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    ttl_secs: Option<u64>,
}

impl RedisSessionStore {
    /// With `ttl_secs` set, a session nobody refreshes disappears once its
    /// refresh token could no longer be valid anyway.
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, ttl_secs: Option<u64>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
            ttl_secs,
        }
    }

    fn key(&self, subject: &Subject) -> String {
        format!("{}:{}", self.prefix, subject)
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn put_session(
        &self,
        subject: &Subject,
        token_hash: &str,
    ) -> Result<(), SessionStoreError> {
        let key = self.key(subject);
        let mut conn = self.conn.clone();
        let _: () = match self.ttl_secs {
            Some(ttl_secs) => conn.set_ex(&key, token_hash, ttl_secs).await,
            None => conn.set(&key, token_hash).await,
        }
        .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn get_session(
        &self,
        subject: &Subject,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let key = self.key(subject);
        let mut conn = self.conn.clone();
        let val: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(val.map(|token_hash| SessionRecord {
            subject: subject.clone(),
            token_hash,
        }))
    }
}
