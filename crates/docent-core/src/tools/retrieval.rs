//! Semantic search over the persisted document collection, exposed to the
//! model as the `retrieve_documents` tool.

use std::fmt::Write;

use docent_llm::LlmProvider;
use docent_memory::{ScoredVectorPoint, VectorStore};
use schemars::JsonSchema;
use serde::Deserialize;

use super::{ToolCall, ToolDef, ToolError, ToolOutput, deserialize_params};

pub const RETRIEVAL_TOOL_ID: &str = "retrieve_documents";

pub const DEFAULT_TOP_K: u64 = 6;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RetrieveParams {
    /// Natural-language description of the information to look up.
    pub query: String,
}

#[must_use]
pub fn retrieval_tool_def() -> ToolDef {
    ToolDef {
        id: RETRIEVAL_TOOL_ID,
        description: "Retrieve relevant passages from the knowledge base to answer user questions.",
        schema: schemars::schema_for!(RetrieveParams),
    }
}

/// A passage returned by semantic search, highest similarity first.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    pub page: Option<u32>,
    pub score: f32,
}

/// Wraps an opened vector store in a query interface. Construction takes the
/// store by value, so a tool can only exist for a store that actually opened.
pub struct RetrievalTool<P, S> {
    store: S,
    provider: P,
    collection: String,
    top_k: u64,
}

impl<P: LlmProvider, S: VectorStore> RetrievalTool<P, S> {
    pub fn new(store: S, provider: P, collection: impl Into<String>, top_k: u64) -> Self {
        Self {
            store,
            provider,
            collection: collection.into(),
            top_k,
        }
    }

    #[must_use]
    pub fn top_k(&self) -> u64 {
        self.top_k
    }

    /// Embed `query` and return the `top_k` most similar chunks, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the vector search fails.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, ToolError> {
        let vector = self.provider.embed(query).await?;
        let hits = self
            .store
            .search(&self.collection, vector, self.top_k)
            .await?;

        let chunks = hits
            .into_iter()
            .filter_map(|hit| match parse_hit(&hit) {
                Some(chunk) => Some(chunk),
                None => {
                    tracing::warn!(id = %hit.id, "dropping search hit with malformed payload");
                    None
                }
            })
            .collect();
        Ok(chunks)
    }

    /// Execute a parsed tool call and render the passages as tool output.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tool ids, bad params, or retrieval failure.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        if call.tool_id != RETRIEVAL_TOOL_ID {
            return Err(ToolError::UnknownTool(call.tool_id.clone()));
        }
        let params: RetrieveParams = deserialize_params(&call.params)?;
        tracing::info!(query = %params.query, top_k = self.top_k, "retrieving");

        let chunks = self.retrieve(&params.query).await?;
        Ok(ToolOutput {
            tool_name: RETRIEVAL_TOOL_ID.to_owned(),
            summary: format_chunks(&chunks),
        })
    }
}

fn parse_hit(hit: &ScoredVectorPoint) -> Option<RetrievedChunk> {
    let content = hit.payload.get("content")?.as_str()?.to_owned();
    let source = hit.payload.get("source")?.as_str()?.to_owned();
    let page = hit
        .payload
        .get("page")
        .and_then(serde_json::Value::as_u64)
        .and_then(|p| u32::try_from(p).ok());
    Some(RetrievedChunk {
        content,
        source,
        page,
        score: hit.score,
    })
}

fn format_chunks(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return "No matching passages found in the knowledge base.".to_owned();
    }
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = write!(out, "[{}] {}", i + 1, chunk.source);
        if let Some(page) = chunk.page {
            let _ = write!(out, " (page {page})");
        }
        let _ = writeln!(out, " (score {:.3})", chunk.score);
        let _ = writeln!(out, "{}", chunk.content.trim());
        if i + 1 < chunks.len() {
            out.push('\n');
        }
    }
    out
}
