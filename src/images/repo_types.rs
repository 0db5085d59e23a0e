use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Local mirror of an image held by the remote image service.
///
/// `id`, `image_url` and both timestamps are copied from the remote side and
/// never computed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ImageRecord {
    pub id: String,
    pub image_url: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub author: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Metadata-only changes; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    pub description: Option<String>,
    pub location: Option<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.location.is_none()
    }

    pub fn apply(&self, record: &mut ImageRecord) {
        if let Some(d) = &self.description {
            record.description = Some(d.clone());
        }
        if let Some(l) = &self.location {
            record.location = Some(l.clone());
        }
    }
}
