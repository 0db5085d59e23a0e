use std::time::Duration;

use anyhow::Context;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError};

/// The only algorithm tokens are minted with or accepted under.
const ALGORITHM: Algorithm = Algorithm::EdDSA;

/// Mints access tokens. Only the auth routes hold one of these.
#[derive(Clone)]
pub struct JwtSigner {
    encoding: EncodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

/// Verifies access tokens against the public key only.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtSigner {
    pub fn from_config(cfg: &JwtConfig) -> anyhow::Result<Self> {
        let encoding = EncodingKey::from_ed_pem(cfg.private_key_pem.as_bytes())
            .context("parse Ed25519 private key")?;
        Ok(Self {
            encoding,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(1) as u64) * 60),
        })
    }

    pub fn sign(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        self.sign_at(user_id, email, OffsetDateTime::now_utc())
    }

    fn sign_at(&self, user_id: Uuid, email: &str, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }
}

impl JwtVerifier {
    pub fn from_config(cfg: &JwtConfig) -> anyhow::Result<Self> {
        let decoding = DecodingKey::from_ed_pem(cfg.public_key_pem.as_bytes())
            .context("parse Ed25519 public key")?;
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        Ok(Self {
            decoding,
            validation,
        })
    }

    /// Every failure collapses into `AppError::InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, "jwt verified");
                Ok(data.claims)
            }
            Err(e) => {
                debug!(kind = ?e.kind(), "jwt rejected");
                Err(AppError::InvalidToken)
            }
        }
    }
}
