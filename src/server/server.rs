use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::{anyhow, ensure};
use jsonwebtoken::Algorithm;
use sqlx::{MySql, Pool};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub session_service: Arc<dyn SessionService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let mut pool = None;
        let store_ttl_secs = Self::store_ttl_secs(settings)?;

        let session_store: Arc<dyn SessionStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemorySessionStore::new()),
            "redis" => {
                let redis_client = redis::Client::open(Self::dsn(settings)?)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(
                    redis_manager,
                    settings.store.redis_prefix.clone(),
                    Some(store_ttl_secs),
                ))
            }
            "mysql" => {
                let mysql_pool = Pool::<MySql>::connect(Self::dsn(settings)?).await?;
                pool = Some(mysql_pool.clone());
                Arc::new(MySqlSessionStore::new(mysql_pool))
            }
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHmacCodec::try_new(JwtConfig {
            algorithm: Algorithm::from_str(&settings.token.algorithm).map_err(|e| anyhow!(e))?,
            access_ttl: Duration::from_secs(settings.token.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.token.refresh_ttl_secs),
            access_key: settings.token.access_secret.clone().into_bytes(),
            refresh_key: settings.token.refresh_secret.clone().into_bytes(),
        })?);

        let token_hasher: Arc<dyn TokenHasher> =
            Arc::new(Argon2TokenHasher::try_new(&Argon2HasherConfig {
                memory_kib: settings.hasher.memory_kib,
                iterations: settings.hasher.iterations,
                parallelism: settings.hasher.parallelism,
            })?);

        let session_service: Arc<dyn SessionService> = match settings.service.backend.as_str() {
            "fake" => Arc::new(FakeSessionService::new()),
            "real" => Arc::new(RealSessionService::new(
                token_codec,
                token_hasher,
                session_store,
                SessionConfig {
                    op_timeout: Duration::from_millis(settings.session.op_timeout_ms),
                },
            )),
            other => return Err(anyhow!("Unknown service backend: {}", other)),
        };

        info!(
            service = %settings.service.backend,
            store = %settings.store.backend,
            "server started"
        );

        Ok(Self {
            session_service,
            pool,
        })
    }

    /// Stored sessions must outlive the refresh tokens they back.
    fn store_ttl_secs(settings: &Settings) -> anyhow::Result<u64> {
        let refresh_ttl_secs = settings.token.refresh_ttl_secs;
        let ttl_secs = settings.store.ttl_secs.unwrap_or(refresh_ttl_secs);
        ensure!(
            ttl_secs >= refresh_ttl_secs,
            "store.ttl_secs ({}) is shorter than token.refresh_ttl_secs ({})",
            ttl_secs,
            refresh_ttl_secs
        );
        Ok(ttl_secs)
    }

    fn dsn(settings: &Settings) -> anyhow::Result<&str> {
        settings.store.dsn.as_deref().ok_or_else(|| {
            anyhow!(
                "store.dsn is required for the {} backend",
                settings.store.backend
            )
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
