//! Startup resolution of retrieval capability.
//!
//! The agent runs in one of two configurations fixed at startup: retrieval
//! available, or no tools at all. The outcome is an explicit tagged value so
//! an unexpected store failure is never mistaken for the store simply not
//! having been built yet.

use std::path::PathBuf;

use docent_llm::LlmProvider;
use docent_memory::{MemoryError, SqliteVectorStore, VectorStore};

use crate::config::Config;
use crate::tools::retrieval::RetrievalTool;

pub enum RagStatus<P, S> {
    /// Store opened; the agent gets the retrieval tool.
    Ready(RetrievalTool<P, S>),
    /// No store at the expected path: expected absence, run the build first.
    Missing { path: PathBuf },
    /// Store present but unusable: misconfiguration, not absence.
    Failed(MemoryError),
}

/// Attempt to open the persisted store and construct the retrieval tool.
///
/// Never fails: every outcome is a [`RagStatus`] variant the caller matches on.
pub async fn bootstrap<P: LlmProvider>(
    config: &Config,
    provider: P,
) -> RagStatus<P, SqliteVectorStore> {
    let store = match SqliteVectorStore::open(&config.store.persist_dir).await {
        Ok(store) => store,
        Err(MemoryError::NotFound { path }) => return RagStatus::Missing { path },
        Err(e) => return RagStatus::Failed(e),
    };

    match store.embedding_model(&config.store.collection).await {
        Ok(Some(built_with)) if built_with != config.llm.embedding_model => {
            tracing::warn!(
                built_with,
                configured = config.llm.embedding_model,
                "store was built with a different embedding model; retrieval quality will degrade"
            );
        }
        Ok(_) => {}
        Err(e) => return RagStatus::Failed(e.into()),
    }

    RagStatus::Ready(RetrievalTool::new(
        store,
        provider,
        config.store.collection.clone(),
        config.store.top_k,
    ))
}
