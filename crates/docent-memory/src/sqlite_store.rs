//! Durable vector store: one SQLite database inside a persist directory.
//!
//! The directory's existence and non-emptiness is the signal other components
//! use to decide whether a store has been built.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error::MemoryError;
use crate::vector_store::{
    ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError, cosine_similarity,
};

const STORE_FILE: &str = "store.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    vector_size INTEGER NOT NULL,
    embedding_model TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS points (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
    vector BLOB NOT NULL,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_points_collection ON points(collection);
";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// [`VectorStore`] persisted as an SQLite database in a directory.
#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
    dir: PathBuf,
}

impl SqliteVectorStore {
    /// Create the persist directory (if absent) and its database, ready for writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created.
    pub async fn create(dir: &Path) -> Result<Self, MemoryError> {
        tokio::fs::create_dir_all(dir).await?;
        let pool = open_pool(&dir.join(STORE_FILE), true).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self {
            pool,
            dir: dir.to_path_buf(),
        })
    }

    /// Open an existing store for querying.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::NotFound`] when the directory is missing or
    /// empty; any other failure means the store is present but unreadable.
    pub async fn open(dir: &Path) -> Result<Self, MemoryError> {
        if !dir.is_dir() || std::fs::read_dir(dir)?.next().is_none() {
            return Err(MemoryError::NotFound {
                path: dir.to_path_buf(),
            });
        }
        let pool = open_pool(&dir.join(STORE_FILE), false).await?;
        Ok(Self {
            pool,
            dir: dir.to_path_buf(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

async fn open_pool(db_path: &Path, create: bool) -> Result<SqlitePool, MemoryError> {
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;
    Ok(pool)
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

impl VectorStore for SqliteVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let size = i64::try_from(vector_size)
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            sqlx::query(
                "INSERT INTO collections (name, vector_size) VALUES (?1, ?2)
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(&collection)
            .bind(size)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let row = sqlx::query("SELECT 1 FROM collections WHERE name = ?1")
                .bind(&collection)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(row.is_some())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            for point in points {
                let payload = serde_json::to_string(&point.payload)
                    .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
                sqlx::query(
                    "INSERT OR REPLACE INTO points (id, collection, vector, payload)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .bind(&point.id)
                .bind(&collection)
                .bind(vector_to_blob(&point.vector))
                .bind(payload)
                .execute(&mut *tx)
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            }
            tx.commit()
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let exists = self
                .collection_exists(&collection)
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            if !exists {
                return Err(VectorStoreError::Search(format!(
                    "collection {collection} not found"
                )));
            }

            let rows = sqlx::query("SELECT id, vector, payload FROM points WHERE collection = ?1")
                .bind(&collection)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;

            let mut scored = Vec::with_capacity(rows.len());
            for row in rows {
                let id: String = row.get("id");
                let blob: Vec<u8> = row.get("vector");
                let payload: String = row.get("payload");
                let payload = serde_json::from_str(&payload)
                    .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
                scored.push(ScoredVectorPoint {
                    id,
                    score: cosine_similarity(&vector, &blob_to_vector(&blob)),
                    payload,
                });
            }

            scored.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            #[expect(clippy::cast_possible_truncation)]
            scored.truncate(limit as usize);
            Ok(scored)
        })
    }

    fn record_embedding_model(
        &self,
        collection: &str,
        model: &str,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        let model = model.to_owned();
        Box::pin(async move {
            let result = sqlx::query("UPDATE collections SET embedding_model = ?1 WHERE name = ?2")
                .bind(&model)
                .bind(&collection)
                .execute(&self.pool)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            if result.rows_affected() == 0 {
                return Err(VectorStoreError::Collection(format!(
                    "collection {collection} not found"
                )));
            }
            Ok(())
        })
    }

    fn embedding_model(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Option<String>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let row = sqlx::query("SELECT embedding_model FROM collections WHERE name = ?1")
                .bind(&collection)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(row.and_then(|r| r.get::<Option<String>, _>("embedding_model")))
        })
    }
}
