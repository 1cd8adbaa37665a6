//! Document ingestion and durable vector storage for docent.
//!
//! PDFs (and plain text) are loaded, split into overlapping chunks, embedded,
//! and persisted in an SQLite-backed vector collection addressed by directory.

pub mod document;
pub mod error;
pub mod in_memory_store;
pub mod sqlite_store;
pub mod vector_store;

pub use document::{
    Chunk, Document, DocumentError, DocumentLoader, DocumentMetadata, IngestionPipeline,
    PdfLoader, SplitterConfig, TextLoader, TextSplitter, scan_documents,
};
pub use error::MemoryError;
pub use in_memory_store::InMemoryVectorStore;
pub use sqlite_store::SqliteVectorStore;
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
