use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::Row;
use thiserror::Error;
use tokio::sync::RwLock;

use repfuel_core::UserDocument;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The persisted document no longer deserializes. This is fatal for the
    /// affected user and is never papered over with defaults.
    #[error("stored document for `{user_id}` is corrupt: {detail}")]
    Corruption { user_id: String, detail: String },
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Whole-document persistence keyed by user_id.
///
/// `get_or_create` is idempotent; `save` replaces the stored document
/// atomically for that user_id and refreshes `updated_at` via
/// [`UserDocument::touch`]. Callers that run a get→mutate→save cycle must
/// serialize per user through [`crate::UserLocks`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_or_create(&self, user_id: &str) -> Result<UserDocument, StoreError>;
    async fn save(&self, document: &mut UserDocument) -> Result<(), StoreError>;
    async fn exists(&self, user_id: &str) -> Result<bool, StoreError>;
}

pub struct SqlDocumentStore {
    pool: DbPool,
}

impl SqlDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn get_or_create(&self, user_id: &str) -> Result<UserDocument, StoreError> {
        let row = sqlx::query("SELECT document FROM user_documents WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            let raw: String = row.get("document");
            return serde_json::from_str(&raw).map_err(|error| StoreError::Corruption {
                user_id: user_id.to_string(),
                detail: error.to_string(),
            });
        }

        let document = UserDocument::new(user_id);
        let encoded = serde_json::to_string(&document)?;
        // Another writer may have created the row between our read and this
        // insert; the conflict clause keeps creation idempotent either way.
        sqlx::query(
            "INSERT INTO user_documents (user_id, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(&encoded)
        .bind(document.created_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(event_name = "store.document.created", user_id, "created user document");
        Ok(document)
    }

    async fn save(&self, document: &mut UserDocument) -> Result<(), StoreError> {
        document.touch();
        let encoded = serde_json::to_string(document)?;
        sqlx::query(
            "INSERT INTO user_documents (user_id, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                 document = excluded.document,
                 updated_at = excluded.updated_at",
        )
        .bind(&document.user_id)
        .bind(&encoded)
        .bind(document.created_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn exists(&self, user_id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS present FROM user_documents WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

/// In-memory store for tests and the agent crate's scenario suites.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, String>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant a raw payload, bypassing serialization. Lets tests exercise the
    /// corruption path.
    pub async fn insert_raw(&self, user_id: &str, payload: &str) {
        let mut documents = self.documents.write().await;
        documents.insert(user_id.to_string(), payload.to_string());
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_or_create(&self, user_id: &str) -> Result<UserDocument, StoreError> {
        {
            let documents = self.documents.read().await;
            if let Some(raw) = documents.get(user_id) {
                return serde_json::from_str(raw).map_err(|error| StoreError::Corruption {
                    user_id: user_id.to_string(),
                    detail: error.to_string(),
                });
            }
        }

        let mut documents = self.documents.write().await;
        if let Some(raw) = documents.get(user_id) {
            return serde_json::from_str(raw).map_err(|error| StoreError::Corruption {
                user_id: user_id.to_string(),
                detail: error.to_string(),
            });
        }
        let document = UserDocument::new(user_id);
        documents.insert(user_id.to_string(), serde_json::to_string(&document)?);
        Ok(document)
    }

    async fn save(&self, document: &mut UserDocument) -> Result<(), StoreError> {
        document.touch();
        let encoded = serde_json::to_string(document)?;
        let mut documents = self.documents.write().await;
        documents.insert(document.user_id.clone(), encoded);
        Ok(())
    }

    async fn exists(&self, user_id: &str) -> Result<bool, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents.contains_key(user_id))
    }
}
