use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("no vector store found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("no documents provided to build the vector store")]
    EmptyCorpus,

    #[error("embedding dimension changed mid-build: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector store error: {0}")]
    VectorStore(#[from] crate::vector_store::VectorStoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] docent_llm::LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
