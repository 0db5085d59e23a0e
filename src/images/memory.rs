use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::ImageStore;
use super::repo_types::{ImageRecord, MetadataPatch};
use crate::error::StoreError;

/// Process-local image store with the same uniqueness rules as the table.
#[derive(Default)]
pub struct MemoryImageStore {
    rows: RwLock<HashMap<String, ImageRecord>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn url_taken(rows: &HashMap<String, ImageRecord>, r: &ImageRecord) -> bool {
    rows.values().any(|o| o.id != r.id && o.image_url == r.image_url)
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn insert(&self, record: &ImageRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&record.id) || url_taken(&rows, record) {
            return Err(StoreError::Duplicate);
        }
        rows.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let mut out: Vec<_> = self.rows.read().await.values().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn upsert(&self, record: &ImageRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        if url_taken(&rows, record) {
            return Err(StoreError::Duplicate);
        }
        let mut next = record.clone();
        if let Some(existing) = rows.get(&record.id) {
            next.author = existing.author;
        }
        rows.insert(next.id.clone(), next);
        Ok(())
    }

    async fn patch(&self, id: &str, patch: &MetadataPatch) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(id) {
            Some(record) => {
                patch.apply(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_owned(&self, id: &str, author: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get(id) {
            Some(r) if r.author == author => {
                rows.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
