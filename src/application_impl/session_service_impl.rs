use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const JTI_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound for each hashing or persistence step.
    pub op_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            op_timeout: Duration::from_secs(5),
        }
    }
}

/// Issues token pairs and rotates them against one stored hash per subject.
///
/// Two concurrent refreshes presenting the same token can both pass the hash
/// check before either writes; both succeed and only the last written pair
/// stays refreshable.
pub struct RealSessionService {
    token_codec: Arc<dyn TokenCodec>,
    token_hasher: Arc<dyn TokenHasher>,
    session_store: Arc<dyn SessionStore>,
    cfg: SessionConfig,
}

impl RealSessionService {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        token_hasher: Arc<dyn TokenHasher>,
        session_store: Arc<dyn SessionStore>,
        cfg: SessionConfig,
    ) -> Self {
        Self {
            token_codec,
            token_hasher,
            session_store,
            cfg,
        }
    }

    #[inline]
    fn new_jti() -> String {
        let mut bytes = [0u8; JTI_LEN];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    async fn bounded<T>(
        &self,
        step: &str,
        fut: impl Future<Output = Result<T, AuthError>>,
        on_timeout: fn(String) -> AuthError,
    ) -> Result<T, AuthError> {
        tokio::time::timeout(self.cfg.op_timeout, fut)
            .await
            .map_err(|_| on_timeout(format!("{} timed out after {:?}", step, self.cfg.op_timeout)))?
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn create_session(&self, subject: &Subject) -> Result<TokenPair, AuthError> {
        let jti = Self::new_jti();

        let (access_token, access_exp) = self
            .token_codec
            .issue_access_token(subject, Some(jti.clone()))
            .await?;
        let (refresh_token, refresh_exp) = self
            .token_codec
            .issue_refresh_token(subject, jti)
            .await?;

        let token_hash = self
            .bounded(
                "refresh token hashing",
                self.token_hasher.hash_token(&refresh_token.0),
                AuthError::InternalError,
            )
            .await?;

        self.bounded(
            "session write",
            async {
                self.session_store
                    .put_session(subject, &token_hash)
                    .await
                    .map_err(AuthError::from)
            },
            AuthError::Persistence,
        )
        .await?;

        info!(%subject, "session issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    async fn refresh_session(
        &self,
        refresh_token: &RefreshToken,
        access_token: Option<&AccessToken>,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.token_codec.verify_refresh_token(refresh_token).await?;

        if let Some(access_token) = access_token {
            let paired = self.token_codec.verify_access_pairing(access_token).await?;
            if paired.sub != claims.sub || paired.jti.is_none() || paired.jti != claims.jti {
                debug!(subject = %claims.sub, "access token is not paired with refresh token");
                return Err(AuthError::TokenInvalid);
            }
        }

        let subject = Subject(claims.sub);

        let record = self
            .bounded(
                "session read",
                async {
                    self.session_store
                        .get_session(&subject)
                        .await
                        .map_err(AuthError::from)
                },
                AuthError::Persistence,
            )
            .await?
            .ok_or_else(|| {
                debug!(%subject, "no live session to rotate");
                AuthError::TokenInvalid
            })?;

        let matches = self
            .bounded(
                "refresh token verification",
                self.token_hasher
                    .verify_token(&refresh_token.0, &record.token_hash),
                AuthError::InternalError,
            )
            .await?;
        if !matches {
            // rotated-out and never-stored tokens are not told apart
            debug!(%subject, "refresh token does not match live session");
            return Err(AuthError::TokenExpired);
        }

        self.create_session(&subject).await
    }

    async fn authenticate(&self, access_token: &AccessToken) -> Result<Subject, AuthError> {
        let claims = self.token_codec.verify_access_token(access_token).await?;
        Ok(Subject(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::token_codec_jwt::tests::test_config;
    use crate::application_impl::token_hasher_argon2::tests::cheap_config;
    use crate::application_impl::{Argon2TokenHasher, JwtConfig, JwtHmacCodec};
    use crate::infra_memory::MemorySessionStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingStore {
        inner: MemorySessionStore,
        puts: AtomicUsize,
        gets: AtomicUsize,
        fail_put: bool,
        fail_get: bool,
        stall_put: bool,
        stall_get: bool,
    }

    impl RecordingStore {
        fn puts(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl SessionStore for RecordingStore {
        async fn put_session(
            &self,
            subject: &Subject,
            token_hash: &str,
        ) -> Result<(), SessionStoreError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.stall_put {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.fail_put {
                return Err(SessionStoreError::Store("connection reset".to_string()));
            }
            self.inner.put_session(subject, token_hash).await
        }

        async fn get_session(
            &self,
            subject: &Subject,
        ) -> Result<Option<SessionRecord>, SessionStoreError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.stall_get {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.fail_get {
                return Err(SessionStoreError::Store("connection reset".to_string()));
            }
            self.inner.get_session(subject).await
        }
    }

    struct StallingHasher;

    #[async_trait::async_trait]
    impl TokenHasher for StallingHasher {
        async fn hash_token(&self, _token: &str) -> Result<String, AuthError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }

        async fn verify_token(&self, _token: &str, _token_hash: &str) -> Result<bool, AuthError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(false)
        }
    }

    fn codec() -> Arc<JwtHmacCodec> {
        Arc::new(JwtHmacCodec::try_new(test_config()).unwrap())
    }

    fn service_with(store: Arc<RecordingStore>) -> RealSessionService {
        RealSessionService::new(
            codec(),
            Arc::new(Argon2TokenHasher::try_new(&cheap_config()).unwrap()),
            store,
            SessionConfig {
                op_timeout: Duration::from_millis(500),
            },
        )
    }

    #[tokio::test]
    async fn create_session_issues_verifiable_pair() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone());
        let subject = Subject::from("u1");

        let pair = service.create_session(&subject).await.unwrap();
        assert!(!pair.access_token.0.is_empty());
        assert!(!pair.refresh_token.0.is_empty());
        assert!(pair.access_token_expires_at < pair.refresh_token_expires_at);
        assert_eq!(store.puts(), 1);

        assert_eq!(service.authenticate(&pair.access_token).await.unwrap(), subject);

        let codec = codec();
        let access = codec.verify_access_token(&pair.access_token).await.unwrap();
        let refresh = codec.verify_refresh_token(&pair.refresh_token).await.unwrap();
        assert_eq!(access.sub, "u1");
        assert_eq!(refresh.sub, "u1");
        assert_eq!(access.jti, refresh.jti);
        assert_eq!(access.jti.as_ref().map(String::len), Some(JTI_LEN * 2));

        let record = store.inner.get_session(&subject).await.unwrap().unwrap();
        assert_ne!(record.token_hash, pair.refresh_token.0);
    }

    #[tokio::test]
    async fn refresh_rotates_and_is_single_use() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone());
        let subject = Subject::from("u1");

        let first = service.create_session(&subject).await.unwrap();
        let first_hash = store.inner.get_session(&subject).await.unwrap().unwrap().token_hash;

        let second = service
            .refresh_session(&first.refresh_token, None)
            .await
            .unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);
        assert_ne!(second.access_token, first.access_token);
        assert_eq!(store.puts(), 2);
        let second_hash = store.inner.get_session(&subject).await.unwrap().unwrap().token_hash;
        assert_ne!(first_hash, second_hash);
        assert_eq!(service.authenticate(&second.access_token).await.unwrap(), subject);

        let err = service
            .refresh_session(&first.refresh_token, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired), "wrong error: {err:?}");
        assert_eq!(store.puts(), 2);

        let third = service
            .refresh_session(&second.refresh_token, None)
            .await
            .unwrap();
        let claims = codec().verify_refresh_token(&third.refresh_token).await.unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[tokio::test]
    async fn refresh_without_session_does_not_write() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone());

        let (refresh, _) = codec()
            .issue_refresh_token(&Subject::from("ghost"), "jti".to_string())
            .await
            .unwrap();

        let err = service.refresh_session(&refresh, None).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid), "wrong error: {err:?}");
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn refresh_rejects_access_token_in_place_of_refresh() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone());

        let pair = service.create_session(&Subject::from("u1")).await.unwrap();
        let err = service
            .refresh_session(&RefreshToken(pair.access_token.0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid), "wrong error: {err:?}");
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_checks_presented_access_token_pairing() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone());

        let mine = service.create_session(&Subject::from("u1")).await.unwrap();
        let other = service.create_session(&Subject::from("u2")).await.unwrap();

        let err = service
            .refresh_session(&mine.refresh_token, Some(&other.access_token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid), "wrong error: {err:?}");

        let rotated = service
            .refresh_session(&mine.refresh_token, Some(&mine.access_token))
            .await
            .unwrap();
        assert_eq!(
            service.authenticate(&rotated.access_token).await.unwrap(),
            Subject::from("u1")
        );
    }

    #[tokio::test]
    async fn write_failure_returns_no_tokens() {
        let store = Arc::new(RecordingStore {
            fail_put: true,
            ..Default::default()
        });
        let service = service_with(store.clone());

        let err = service.create_session(&Subject::from("u1")).await.unwrap_err();
        assert!(matches!(err, AuthError::Persistence(_)), "wrong error: {err:?}");
        assert_eq!(store.puts(), 1);
    }

    #[tokio::test]
    async fn read_failure_is_persistence_error() {
        let store = Arc::new(RecordingStore {
            fail_get: true,
            ..Default::default()
        });
        let service = service_with(store.clone());

        let (refresh, _) = codec()
            .issue_refresh_token(&Subject::from("u1"), "jti".to_string())
            .await
            .unwrap();
        let err = service.refresh_session(&refresh, None).await.unwrap_err();
        assert!(matches!(err, AuthError::Persistence(_)), "wrong error: {err:?}");
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn stalled_store_times_out() {
        let store = Arc::new(RecordingStore {
            stall_get: true,
            ..Default::default()
        });
        let service = service_with(store.clone());

        let (refresh, _) = codec()
            .issue_refresh_token(&Subject::from("u1"), "jti".to_string())
            .await
            .unwrap();
        let err = service.refresh_session(&refresh, None).await.unwrap_err();
        assert!(matches!(err, AuthError::Persistence(_)), "wrong error: {err:?}");
    }

    #[tokio::test]
    async fn session_of_one_subject_does_not_refresh_another() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone());

        service.create_session(&Subject::from("u1")).await.unwrap();
        let u2 = service.create_session(&Subject::from("u2")).await.unwrap();
        // a new login for u1 must not disturb u2
        service.create_session(&Subject::from("u1")).await.unwrap();

        let rotated = service.refresh_session(&u2.refresh_token, None).await.unwrap();
        let claims = codec().verify_access_token(&rotated.access_token).await.unwrap();
        assert_eq!(claims.sub, "u2");
    }

    #[tokio::test]
    async fn new_login_invalidates_previous_refresh_token() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone());
        let subject = Subject::from("u1");

        let old = service.create_session(&subject).await.unwrap();
        service.create_session(&subject).await.unwrap();

        let err = service.refresh_session(&old.refresh_token, None).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired), "wrong error: {err:?}");
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected_before_lookup() {
        let store = Arc::new(RecordingStore::default());
        let short_lived = Arc::new(
            JwtHmacCodec::try_new(JwtConfig {
                refresh_ttl: Duration::ZERO,
                ..test_config()
            })
            .unwrap(),
        );
        let service = RealSessionService::new(
            short_lived.clone(),
            Arc::new(Argon2TokenHasher::try_new(&cheap_config()).unwrap()),
            store.clone(),
            SessionConfig::default(),
        );

        let (refresh, _) = short_lived
            .issue_refresh_token(&Subject::from("u1"), RealSessionService::new_jti())
            .await
            .unwrap();
        // exp has one-second resolution
        tokio::time::sleep(Duration::from_millis(2100)).await;

        let err = service.refresh_session(&refresh, None).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired), "wrong error: {err:?}");
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
        assert_eq!(store.puts(), 0);
    }

    #[tokio::test]
    async fn stalled_write_is_persistence_error() {
        let store = Arc::new(RecordingStore {
            stall_put: true,
            ..Default::default()
        });
        let service = service_with(store.clone());

        let err = service.create_session(&Subject::from("u1")).await.unwrap_err();
        assert!(matches!(err, AuthError::Persistence(_)), "wrong error: {err:?}");
        assert_eq!(store.puts(), 1);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn stalled_hasher_is_internal_error() {
        let store = Arc::new(RecordingStore::default());
        let service = RealSessionService::new(
            codec(),
            Arc::new(StallingHasher),
            store.clone(),
            SessionConfig {
                op_timeout: Duration::from_millis(500),
            },
        );

        let err = service.create_session(&Subject::from("u1")).await.unwrap_err();
        assert!(matches!(err, AuthError::InternalError(_)), "wrong error: {err:?}");
        assert_eq!(store.puts(), 0);
    }
}
