use crate::application_port::*;
use anyhow::anyhow;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

#[derive(Debug, Clone)]
pub struct Argon2HasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Argon2id over refresh tokens. Slow and salted so a leaked session table
/// cannot be brute-forced offline; work runs on the blocking pool.
pub struct Argon2TokenHasher {
    params: Params,
}

impl Argon2TokenHasher {
    pub fn try_new(cfg: &Argon2HasherConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow!("invalid argon2 parameters: {}", e))?;
        Ok(Argon2TokenHasher { params })
    }

    fn hasher(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }
}

#[async_trait::async_trait]
impl TokenHasher for Argon2TokenHasher {
    async fn hash_token(&self, token: &str) -> Result<String, AuthError> {
        let params = self.params.clone();
        let token = token.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Self::hasher(params)
                .hash_password(token.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::InternalError(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::InternalError(format!("hashing task failed: {}", e)))?
    }

    async fn verify_token(&self, token: &str, token_hash: &str) -> Result<bool, AuthError> {
        let params = self.params.clone();
        let token = token.to_owned();
        let token_hash = token_hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&token_hash)
                .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {}", e)))?;
            // cost parameters are read back from the stored hash
            match Self::hasher(params).verify_password(token.as_bytes(), &parsed) {
                Ok(_) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::InternalError(format!("verify error: {}", e))),
            }
        })
        .await
        .map_err(|e| AuthError::InternalError(format!("verify task failed: {}", e)))?
    }
}
