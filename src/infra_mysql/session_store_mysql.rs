use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

/// Backed by the `auth_session` table, see `migrations/0001_auth_session.sql`.
pub struct MySqlSessionStore {
    pool: MySqlPool,
}

impl MySqlSessionStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlSessionStore { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<SessionRecord, SessionStoreError> {
        let subject: String = row
            .try_get("subject")
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        let token_hash: String = row
            .try_get("token_hash")
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;

        Ok(SessionRecord {
            subject: Subject(subject),
            token_hash,
        })
    }
}

#[async_trait::async_trait]
impl SessionStore for MySqlSessionStore {
    async fn put_session(
        &self,
        subject: &Subject,
        token_hash: &str,
    ) -> Result<(), SessionStoreError> {
        sqlx::query(
            r#"
INSERT INTO auth_session (subject, token_hash)
VALUES (?, ?)
ON DUPLICATE KEY UPDATE token_hash = VALUES(token_hash), updated_at = CURRENT_TIMESTAMP(3)
"#,
        )
        .bind(subject.as_str())
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionStoreError::Store(e.to_string()))?;

        Ok(())
    }

    async fn get_session(
        &self,
        subject: &Subject,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT subject, token_hash
FROM auth_session
WHERE subject = ?
"#,
        )
        .bind(subject.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionStoreError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }
}
