use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::images::content::UpstreamError;

/// Failure taxonomy shared by the auth and image flows.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Wrong email or password. Deliberately carries no detail.
    #[error("invalid credentials")]
    AuthFailure,

    #[error("missing or malformed bearer token")]
    MissingToken,

    /// Signature, expiry, algorithm or structure check failed.
    #[error("invalid token")]
    InvalidToken,

    #[error("not found")]
    NotFound,

    #[error("upstream: {0}")]
    Upstream(#[from] UpstreamError),

    /// The remote side committed but the local mirror could not follow.
    #[error("reconciliation fault during {op} of image {id}: {source}")]
    Reconciliation {
        op: &'static str,
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Failures a store can report back to the services.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    Duplicate,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Duplicate
            }
            _ => StoreError::Other(e.into()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AppError::Duplicate("Duplicate key".into()),
            StoreError::Other(e) => AppError::Internal(e),
        }
    }
}

impl AppError {
    pub fn reconciliation(op: &'static str, id: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        let id = id.into();
        let source = source.into();
        error!(target: "imagesync::reconciliation", %op, image_id = %id, error = %source, "remote and local stores diverged");
        AppError::Reconciliation { op, id, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::AuthFailure => StatusCode::CONFLICT,
            AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Reconciliation { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(msg) | AppError::Duplicate(msg) => msg.clone(),
            AppError::AuthFailure => "Invalid credentials".to_string(),
            AppError::MissingToken => "Missing or malformed Authorization header".to_string(),
            AppError::InvalidToken => "Forbidden".to_string(),
            AppError::NotFound => "Not found".to_string(),
            AppError::Upstream(e) => {
                error!(target: "imagesync::upstream", error = %e, "image service call failed");
                "Image service unavailable".to_string()
            }
            // already logged when constructed
            AppError::Reconciliation { .. } => "Internal server error".to_string(),
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
        };
        if status.is_client_error() {
            warn!(%status, error = %self, "request rejected");
        }
        (status, body).into_response()
    }
}
