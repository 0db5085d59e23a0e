use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{ImageRecord, MetadataPatch};
use crate::error::StoreError;

/// Persistence for the local image metadata mirror.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn insert(&self, record: &ImageRecord) -> Result<(), StoreError>;
    async fn find(&self, id: &str) -> Result<Option<ImageRecord>, StoreError>;
    async fn list(&self) -> Result<Vec<ImageRecord>, StoreError>;
    /// Inserts or refreshes the mirror. An existing row keeps its `author`.
    async fn upsert(&self, record: &ImageRecord) -> Result<(), StoreError>;
    /// Returns `false` when no row matched `id`.
    async fn patch(&self, id: &str, patch: &MetadataPatch) -> Result<bool, StoreError>;
    /// Deletes only a row owned by `author`; `false` when nothing matched.
    async fn delete_owned(&self, id: &str, author: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgImageStore {
    db: PgPool,
}

impl PgImageStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImageStore for PgImageStore {
    async fn insert(&self, r: &ImageRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO images (id, image_url, description, location, author, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&r.id)
        .bind(&r.image_url)
        .bind(&r.description)
        .bind(&r.location)
        .bind(r.author)
        .bind(r.created_at)
        .bind(r.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<ImageRecord>, StoreError> {
        let row = sqlx::query_as::<_, ImageRecord>(
            r#"
            SELECT id, image_url, description, location, author, created_at, updated_at
              FROM images
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ImageRecord>(
            r#"
            SELECT id, image_url, description, location, author, created_at, updated_at
              FROM images
             ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn upsert(&self, r: &ImageRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO images (id, image_url, description, location, author, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
               SET image_url   = EXCLUDED.image_url,
                   description = EXCLUDED.description,
                   location    = EXCLUDED.location,
                   created_at  = EXCLUDED.created_at,
                   updated_at  = EXCLUDED.updated_at
            "#,
        )
        .bind(&r.id)
        .bind(&r.image_url)
        .bind(&r.description)
        .bind(&r.location)
        .bind(r.author)
        .bind(r.created_at)
        .bind(r.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn patch(&self, id: &str, patch: &MetadataPatch) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE images
               SET description = COALESCE($2, description),
                   location    = COALESCE($3, location)
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.description)
        .bind(&patch.location)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn delete_owned(&self, id: &str, author: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query(r#"DELETE FROM images WHERE id = $1 AND author = $2"#)
            .bind(id)
            .bind(author)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
