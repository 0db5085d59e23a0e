use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// PEM encoded Ed25519 private key (PKCS#8).
    pub private_key_pem: String,
    /// PEM encoded Ed25519 public key (SPKI).
    pub public_key_pem: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageServiceConfig {
    pub base_url: String,
    pub access_token: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub image_service: ImageServiceConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let db_max_connections = parsed_var("DB_MAX_CONNECTIONS").unwrap_or(10);

        let jwt = JwtConfig {
            private_key_pem: pem_var("JWT_PRIVATE_KEY")?,
            public_key_pem: pem_var("JWT_PUBLIC_KEY")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "imagesync".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "imagesync-users".into()),
            ttl_minutes: parsed_var("JWT_TTL_MINUTES").unwrap_or(15),
        };

        let image_service = ImageServiceConfig {
            base_url: std::env::var("IMAGE_SERVICE_URL").context("IMAGE_SERVICE_URL")?,
            access_token: std::env::var("IMAGE_SERVICE_TOKEN").context("IMAGE_SERVICE_TOKEN")?,
            timeout_secs: parsed_var("IMAGE_SERVICE_TIMEOUT_SECS").unwrap_or(10),
        };

        Ok(Self {
            database_url,
            db_max_connections,
            jwt,
            image_service,
        })
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

/// Reads `NAME` as an inline PEM, falling back to the file named by `NAME_FILE`.
fn pem_var(name: &str) -> anyhow::Result<String> {
    if let Ok(inline) = std::env::var(name) {
        // .env files usually carry the PEM on one line with literal \n
        return Ok(inline.replace("\\n", "\n"));
    }
    let file_var = format!("{}_FILE", name);
    let path = std::env::var(&file_var)
        .with_context(|| format!("either {} or {} must be set", name, file_var))?;
    std::fs::read_to_string(&path).with_context(|| format!("read {} from {}", name, path))
}
