use std::collections::HashMap;

use docent_llm::LlmProvider;
use uuid::Uuid;

use super::splitter::TextSplitter;
use super::types::{Chunk, Document};
use crate::error::MemoryError;
use crate::vector_store::{VectorPoint, VectorStore};

/// Offline build step: split documents, embed every chunk, persist the
/// embedded chunks into a named collection.
///
/// Rerunning the build against an existing collection appends new points
/// rather than replacing old ones; callers that want a clean rebuild must
/// clear the persist directory first.
pub struct IngestionPipeline<P, S> {
    splitter: TextSplitter,
    store: S,
    provider: P,
    collection: String,
    embedding_model: String,
}

impl<P: LlmProvider, S: VectorStore> IngestionPipeline<P, S> {
    pub fn new(
        splitter: TextSplitter,
        store: S,
        provider: P,
        collection: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            splitter,
            store,
            provider,
            collection: collection.into(),
            embedding_model: embedding_model.into(),
        }
    }

    /// Split, embed, and persist `documents`. Returns the chunk count.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::EmptyCorpus`], before touching the store, when
    /// `documents` is empty, and propagates embedding and storage failures.
    pub async fn ingest_all(&self, documents: &[Document]) -> Result<usize, MemoryError> {
        if documents.is_empty() {
            return Err(MemoryError::EmptyCorpus);
        }

        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| self.splitter.split(doc))
            .collect();
        if chunks.is_empty() {
            tracing::warn!("documents contained no text, nothing to ingest");
            return Ok(0);
        }
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "splitting complete"
        );

        let mut points = Vec::with_capacity(chunks.len());
        let mut dimension: Option<usize> = None;
        for chunk in &chunks {
            let vector = self.provider.embed(&chunk.content).await?;
            match dimension {
                None => dimension = Some(vector.len()),
                Some(expected) if expected != vector.len() => {
                    return Err(MemoryError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
            }
            points.push(VectorPoint {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: chunk_payload(chunk),
            });
        }

        let dimension = dimension.unwrap_or_default();
        self.store
            .ensure_collection(&self.collection, dimension as u64)
            .await?;
        let count = points.len();
        self.store.upsert(&self.collection, points).await?;
        self.store
            .record_embedding_model(&self.collection, &self.embedding_model)
            .await?;

        tracing::info!(
            collection = %self.collection,
            chunks = count,
            dimension,
            "vector store build complete"
        );
        Ok(count)
    }
}

fn chunk_payload(chunk: &Chunk) -> HashMap<String, serde_json::Value> {
    let mut payload = HashMap::from([
        (
            "source".to_owned(),
            serde_json::json!(chunk.metadata.source),
        ),
        (
            "content_type".to_owned(),
            serde_json::json!(chunk.metadata.content_type),
        ),
        (
            "chunk_index".to_owned(),
            serde_json::json!(chunk.chunk_index),
        ),
        ("content".to_owned(), serde_json::json!(chunk.content)),
    ]);
    if let Some(page) = chunk.metadata.page {
        payload.insert("page".to_owned(), serde_json::json!(page));
    }
    payload
}
