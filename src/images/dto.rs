use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::content::ContentPayload;
use super::repo_types::{ImageRecord, MetadataPatch};
use super::services::{ImagePayload, ReconcileOutcome};

/// Blank strings count as "not provided".
fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Body of `POST /images` and `PUT /images/:id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBody {
    // missing fields are reported by payload validation
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub content_type: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl From<ImageBody> for ImagePayload {
    fn from(b: ImageBody) -> Self {
        Self {
            content: ContentPayload {
                data: b.data,
                content_type: b.content_type.trim().to_lowercase(),
            },
            description: non_blank(b.description),
            location: non_blank(b.location),
        }
    }
}

/// Body of `PATCH /images/:id`.
#[derive(Debug, Deserialize)]
pub struct PatchBody {
    pub description: Option<String>,
    pub location: Option<String>,
}

impl From<PatchBody> for MetadataPatch {
    fn from(b: PatchBody) -> Self {
        Self {
            description: non_blank(b.description),
            location: non_blank(b.location),
        }
    }
}

/// Client-facing image. Unset optionals are left out, never `null`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub id: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub author: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ImageRecord> for ImageView {
    fn from(r: ImageRecord) -> Self {
        Self {
            id: r.id,
            image_url: r.image_url,
            description: r.description,
            location: r.location,
            author: r.author,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageView>,
}

impl From<ReconcileOutcome> for ReconcileResponse {
    fn from(o: ReconcileOutcome) -> Self {
        match o {
            ReconcileOutcome::Restored(r) => Self {
                outcome: "restored",
                image: Some(r.into()),
            },
            ReconcileOutcome::Removed => Self {
                outcome: "removed",
                image: None,
            },
            ReconcileOutcome::Unchanged => Self {
                outcome: "unchanged",
                image: None,
            },
        }
    }
}
