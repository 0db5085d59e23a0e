use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::jwt::{JwtSigner, JwtVerifier};
use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::images::content::HttpContentClient;
use crate::images::repo::PgImageStore;
use crate::images::services::Synchronizer;

/// Everything a request needs, built once at startup and shared read-only.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub signer: Arc<JwtSigner>,
    pub verifier: Arc<JwtVerifier>,
    pub images: Synchronizer,
}

impl AppState {
    pub fn init(config: &AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let signer = Arc::new(JwtSigner::from_config(&config.jwt)?);
        let verifier = Arc::new(JwtVerifier::from_config(&config.jwt)?);

        let content = Arc::new(HttpContentClient::new(&config.image_service)?);
        let images = Synchronizer::new(Arc::new(PgImageStore::new(db)), content);

        Ok(Self::from_parts(users, signer, verifier, images))
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        signer: Arc<JwtSigner>,
        verifier: Arc<JwtVerifier>,
        images: Synchronizer,
    ) -> Self {
        Self {
            users,
            signer,
            verifier,
            images,
        }
    }
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
