use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::content::{ContentClient, ContentPayload, RemoteImage, UpstreamError};
use super::repo::ImageStore;
use super::repo_types::{ImageRecord, MetadataPatch};
use crate::{auth::claims::Claims, error::AppError};

pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/gif", "image/jpeg", "image/png"];

/// Full image body for create and replace.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub content: ContentPayload,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// What `Synchronizer::reconcile` did to the local mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Mirror written from the remote canonical record.
    Restored(ImageRecord),
    /// Remote object is gone, so the mirror was dropped.
    Removed,
    Unchanged,
}

/// Keeps the metadata store in step with the remote image service.
///
/// Every mutation is two phases: the remote call first, then the local write
/// only if the remote call returned its expected status. A local failure after
/// a remote success is a reconciliation fault; `reconcile` is the repair path.
#[derive(Clone)]
pub struct Synchronizer {
    store: Arc<dyn ImageStore>,
    content: Arc<dyn ContentClient>,
    /// Remote images whose create never got a local row, keyed to the creator.
    orphans: Arc<Mutex<HashMap<String, Uuid>>>,
}

fn validate(payload: &ImagePayload) -> Result<(), AppError> {
    if payload.content.data.trim().is_empty() {
        return Err(AppError::Validation("data is required".into()));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&payload.content.content_type.as_str()) {
        return Err(AppError::Validation(format!(
            "contentType must be one of {}",
            ALLOWED_CONTENT_TYPES.join(", ")
        )));
    }
    Ok(())
}

/// Remote 404 on an addressed image is the caller's not-found.
fn remote_failure(e: UpstreamError) -> AppError {
    if e.is_not_found() {
        AppError::NotFound
    } else {
        AppError::Upstream(e)
    }
}

/// Postgres keeps microseconds; both stores must hold the same instant.
fn to_micros(t: OffsetDateTime) -> OffsetDateTime {
    t.replace_nanosecond(t.nanosecond() / 1_000 * 1_000).unwrap_or(t)
}

fn mirror(
    remote: RemoteImage,
    author: Uuid,
    description: Option<String>,
    location: Option<String>,
) -> ImageRecord {
    ImageRecord {
        id: remote.id,
        image_url: remote.image_url,
        description,
        location,
        author,
        created_at: to_micros(remote.created_at),
        updated_at: to_micros(remote.updated_at),
    }
}

impl Synchronizer {
    pub fn new(store: Arc<dyn ImageStore>, content: Arc<dyn ContentClient>) -> Self {
        Self {
            store,
            content,
            orphans: Arc::default(),
        }
    }

    /// Only the author may touch an image. Without a local row that is the
    /// user whose create left the remote image orphaned; otherwise nobody.
    async fn check_owner(&self, id: &str, local: Option<&ImageRecord>, owner: &Claims) -> Result<(), AppError> {
        let author = match local {
            Some(record) => Some(record.author),
            None => self.orphans.lock().await.get(id).copied(),
        };
        match author {
            Some(author) if author == owner.sub => Ok(()),
            Some(author) => {
                warn!(image_id = %id, %author, "access to someone else's image refused");
                Err(AppError::NotFound)
            }
            None => Err(AppError::NotFound),
        }
    }

    async fn settle_orphan(&self, id: &str) {
        if self.orphans.lock().await.remove(id).is_some() {
            info!(target: "imagesync::reconciliation", image_id = %id, "orphaned image settled");
        }
    }

    #[instrument(skip(self, owner, payload), fields(user_id = %owner.sub))]
    pub async fn create(&self, owner: &Claims, payload: ImagePayload) -> Result<ImageRecord, AppError> {
        validate(&payload)?;

        let remote = self
            .content
            .create(&payload.content)
            .await
            .map_err(AppError::Upstream)?;

        let record = mirror(remote, owner.sub, payload.description, payload.location);
        if let Err(e) = self.store.insert(&record).await {
            self.orphans.lock().await.insert(record.id.clone(), owner.sub);
            return Err(AppError::reconciliation("create", record.id, e));
        }

        info!(image_id = %record.id, "image created");
        Ok(record)
    }

    /// Full update. Description and location fall back to the stored values
    /// when the payload leaves them out.
    #[instrument(skip(self, owner, payload), fields(user_id = %owner.sub))]
    pub async fn replace(&self, id: &str, owner: &Claims, payload: ImagePayload) -> Result<(), AppError> {
        validate(&payload)?;
        let existing = self.store.find(id).await?;
        self.check_owner(id, existing.as_ref(), owner).await?;

        self.content
            .replace(id, &payload.content)
            .await
            .map_err(remote_failure)?;

        // the 204 has no body, so the canonical fields need a second call
        let remote = self
            .content
            .fetch(id)
            .await
            .map_err(|e| AppError::reconciliation("replace", id, e))?;

        let (description, location) = match existing {
            Some(old) => (
                payload.description.or(old.description),
                payload.location.or(old.location),
            ),
            None => {
                warn!(target: "imagesync::reconciliation", image_id = %id, "remote image had no local mirror; restoring");
                (payload.description, payload.location)
            }
        };
        let record = mirror(remote, owner.sub, description, location);
        self.store
            .upsert(&record)
            .await
            .map_err(|e| AppError::reconciliation("replace", id, e))?;
        self.settle_orphan(id).await;

        info!(image_id = %id, "image replaced");
        Ok(())
    }

    /// Metadata-only change; the image service is not involved.
    #[instrument(skip(self, owner, patch), fields(user_id = %owner.sub))]
    pub async fn partial_update(&self, id: &str, owner: &Claims, patch: MetadataPatch) -> Result<(), AppError> {
        let Some(existing) = self.store.find(id).await? else {
            return Err(AppError::NotFound);
        };
        self.check_owner(id, Some(&existing), owner).await?;
        if patch.is_empty() {
            debug!(image_id = %id, "empty patch");
            return Ok(());
        }
        // the row can vanish between the two calls
        if !self.store.patch(id, &patch).await? {
            return Err(AppError::NotFound);
        }
        info!(image_id = %id, "image metadata updated");
        Ok(())
    }

    #[instrument(skip(self, owner), fields(user_id = %owner.sub))]
    pub async fn delete(&self, id: &str, owner: &Claims) -> Result<(), AppError> {
        let existing = self.store.find(id).await?;
        self.check_owner(id, existing.as_ref(), owner).await?;

        if let Err(e) = self.content.delete(id).await {
            if e.is_not_found() {
                match existing {
                    Some(_) => warn!(target: "imagesync::reconciliation", image_id = %id, "local mirror has no remote image"),
                    None => self.settle_orphan(id).await,
                }
            }
            return Err(remote_failure(e));
        }

        match self.store.delete_owned(id, owner.sub).await {
            Ok(true) => info!(image_id = %id, "image deleted"),
            Ok(false) => debug!(image_id = %id, "remote image deleted; no local mirror"),
            Err(e) => return Err(AppError::reconciliation("delete", id, e)),
        }
        self.settle_orphan(id).await;
        Ok(())
    }

    /// Every mirrored image, newest first.
    #[instrument(skip(self, owner), fields(user_id = %owner.sub))]
    pub async fn list(&self, owner: &Claims) -> Result<Vec<ImageRecord>, AppError> {
        Ok(self.store.list().await?)
    }

    pub async fn get_one(&self, id: &str) -> Result<ImageRecord, AppError> {
        self.store.find(id).await?.ok_or(AppError::NotFound)
    }

    /// Repair path after a reconciliation fault: re-reads the remote image and
    /// makes the caller's mirror match it.
    #[instrument(skip(self, owner), fields(user_id = %owner.sub))]
    pub async fn reconcile(&self, id: &str, owner: &Claims) -> Result<ReconcileOutcome, AppError> {
        let local = self.store.find(id).await?;
        self.check_owner(id, local.as_ref(), owner).await?;

        match self.content.fetch(id).await {
            Ok(remote) => {
                let (description, location) = local
                    .as_ref()
                    .map(|r| (r.description.clone(), r.location.clone()))
                    .unwrap_or_default();
                let record = mirror(remote, owner.sub, description, location);
                if local.as_ref() == Some(&record) {
                    return Ok(ReconcileOutcome::Unchanged);
                }
                self.store
                    .upsert(&record)
                    .await
                    .map_err(|e| AppError::reconciliation("reconcile", id, e))?;
                self.settle_orphan(id).await;
                info!(target: "imagesync::reconciliation", image_id = %id, "mirror restored from remote");
                Ok(ReconcileOutcome::Restored(record))
            }
            Err(e) if e.is_not_found() => {
                if local.is_none() {
                    self.settle_orphan(id).await;
                    return Err(AppError::NotFound);
                }
                self.store
                    .delete_owned(id, owner.sub)
                    .await
                    .map_err(|e| AppError::reconciliation("reconcile", id, e))?;
                info!(target: "imagesync::reconciliation", image_id = %id, "stale mirror removed");
                Ok(ReconcileOutcome::Removed)
            }
            Err(e) => Err(AppError::Upstream(e)),
        }
    }
}
