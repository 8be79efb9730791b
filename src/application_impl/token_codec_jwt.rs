use crate::application_port::*;
use crate::domain_model::*;
use anyhow::ensure;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Clone)]
pub struct JwtConfig {
    pub algorithm: Algorithm,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub access_key: Vec<u8>,
    pub refresh_key: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

fn encode_claims(
    claims: &TokenClaims,
    algorithm: Algorithm,
    key: &[u8],
) -> Result<String, AuthError> {
    encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))
}

fn encode_token(
    subject: &Subject,
    jti: Option<String>,
    ttl: Duration,
    algorithm: Algorithm,
    key: &[u8],
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let exp_dt = iat_dt + ttl;
    let claims = TokenClaims {
        sub: subject.to_string(),
        iat: iat_dt.timestamp(),
        exp: exp_dt.timestamp(),
        jti,
    };
    let token = encode_claims(&claims, algorithm, key)?;
    Ok((token, exp_dt))
}

/// The signature is checked before the claims, so a well-signed but stale
/// token reports `TokenExpired` and anything else reports `TokenInvalid`.
fn decode_token(
    token: &str,
    kind: TokenKind,
    key: &[u8],
    validate_exp: bool,
) -> Result<TokenClaims, AuthError> {
    let mut v = Validation::new(Algorithm::HS512);
    v.algorithms = HMAC_ALGORITHMS.to_vec();
    v.leeway = 0;
    v.validate_exp = validate_exp;
    v.validate_aud = false;
    let data = decode::<TokenClaims>(token, &DecodingKey::from_secret(key), &v).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            reason => {
                debug!(%kind, ?reason, "token rejected");
                AuthError::TokenInvalid
            }
        }
    })?;
    Ok(data.claims)
}

/// HMAC-signed claim tokens. Access and refresh tokens use separate keys so
/// one can never be accepted in place of the other.
pub struct JwtHmacCodec {
    cfg: JwtConfig,
}

impl JwtHmacCodec {
    pub fn try_new(cfg: JwtConfig) -> anyhow::Result<Self> {
        ensure!(
            HMAC_ALGORITHMS.contains(&cfg.algorithm),
            "token algorithm must be one of HS256, HS384, HS512, got {:?}",
            cfg.algorithm
        );
        ensure!(!cfg.access_key.is_empty(), "access signing key is empty");
        ensure!(!cfg.refresh_key.is_empty(), "refresh signing key is empty");
        ensure!(
            cfg.access_key != cfg.refresh_key,
            "access and refresh signing keys must differ"
        );
        Ok(JwtHmacCodec { cfg })
    }

    fn key(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => &self.cfg.access_key,
            TokenKind::Refresh => &self.cfg.refresh_key,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.cfg.access_ttl,
            TokenKind::Refresh => self.cfg.refresh_ttl,
        }
    }

    fn issue(
        &self,
        subject: &Subject,
        jti: Option<String>,
        kind: TokenKind,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        encode_token(subject, jti, self.ttl(kind), self.cfg.algorithm, self.key(kind))
    }

    fn verify(
        &self,
        token: &str,
        kind: TokenKind,
        validate_exp: bool,
    ) -> Result<TokenClaims, AuthError> {
        decode_token(token, kind, self.key(kind), validate_exp)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHmacCodec {
    async fn issue_access_token(
        &self,
        subject: &Subject,
        jti: Option<String>,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = self.issue(subject, jti, TokenKind::Access)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh_token(
        &self,
        subject: &Subject,
        jti: String,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = self.issue(subject, Some(jti), TokenKind::Refresh)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access_token(&self, token: &AccessToken) -> Result<TokenClaims, AuthError> {
        self.verify(&token.0, TokenKind::Access, true)
    }

    async fn verify_refresh_token(&self, token: &RefreshToken) -> Result<TokenClaims, AuthError> {
        self.verify(&token.0, TokenKind::Refresh, true)
    }

    async fn verify_access_pairing(&self, token: &AccessToken) -> Result<TokenClaims, AuthError> {
        self.verify(&token.0, TokenKind::Access, false)
    }
}
