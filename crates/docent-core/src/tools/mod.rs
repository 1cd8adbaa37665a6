pub mod retrieval;

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub tool_id: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid tool parameters: {message}")]
    InvalidParams { message: String },

    #[error("embedding failed: {0}")]
    Embed(#[from] docent_llm::LlmError),

    #[error("vector search failed: {0}")]
    Search(#[from] docent_memory::VectorStoreError),
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool_name: String,
    pub summary: String,
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

/// Deserialize a tool call's params map into a typed struct.
///
/// # Errors
///
/// Returns [`ToolError::InvalidParams`] if the map does not match `T`.
pub fn deserialize_params<T: serde::de::DeserializeOwned>(
    params: &HashMap<String, serde_json::Value>,
) -> Result<T, ToolError> {
    let value = serde_json::to_value(params).map_err(|e| ToolError::InvalidParams {
        message: e.to_string(),
    })?;
    serde_json::from_value(value).map_err(|e| ToolError::InvalidParams {
        message: e.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct ToolDef {
    pub id: &'static str,
    pub description: &'static str,
    pub schema: schemars::Schema,
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    #[must_use]
    pub fn from_definitions(tools: Vec<ToolDef>) -> Self {
        Self { tools }
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Format the tool catalog for the system prompt.
    #[must_use]
    pub fn format_for_prompt(&self) -> String {
        let mut out = String::from("<tools>\n");
        for tool in &self.tools {
            format_tool(&mut out, tool);
        }
        out.push_str("</tools>");
        out
    }
}

fn format_tool(out: &mut String, tool: &ToolDef) {
    let _ = writeln!(out, "## {}", tool.id);
    let _ = writeln!(out, "{}", tool.description);
    let _ = writeln!(
        out,
        "Invocation: use a ```tool_call fenced block containing \
         {{\"tool_id\": \"{}\", \"params\": {{...}}}}",
        tool.id
    );

    let schema = tool.schema.as_value();
    let required: Vec<&str> = schema
        .pointer("/required")
        .and_then(serde_json::Value::as_array)
        .map(|arr| arr.iter().filter_map(serde_json::Value::as_str).collect())
        .unwrap_or_default();

    if let Some(props) = schema
        .pointer("/properties")
        .and_then(serde_json::Value::as_object)
    {
        let _ = writeln!(out, "Params:");
        for (name, sub) in props {
            let ty = sub
                .get("type")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("any");
            let marker = if required.contains(&name.as_str()) {
                ", required"
            } else {
                ""
            };
            match sub.get("description").and_then(serde_json::Value::as_str) {
                Some(desc) => {
                    let _ = writeln!(out, "- {name} ({ty}{marker}): {desc}");
                }
                None => {
                    let _ = writeln!(out, "- {name} ({ty}{marker})");
                }
            }
        }
    }
    out.push('\n');
}

/// Extract fenced code blocks with the given language marker from text.
#[must_use]
pub fn extract_fenced_blocks<'a>(text: &'a str, lang: &str) -> Vec<&'a str> {
    let marker = format!("```{lang}");
    let marker_len = marker.len();
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(&marker) {
        let after = &rest[start + marker_len..];
        if let Some(end) = after.find("```") {
            blocks.push(after[..end].trim());
            rest = &after[end + 3..];
        } else {
            break;
        }
    }

    blocks
}

/// Parse every ```tool_call block in an LLM response. Malformed blocks are
/// logged and skipped so one bad block cannot poison the rest.
#[must_use]
pub fn parse_tool_calls(response: &str) -> Vec<ToolCall> {
    extract_fenced_blocks(response, "tool_call")
        .into_iter()
        .filter_map(|block| match serde_json::from_str::<ToolCall>(block) {
            Ok(call) => Some(call),
            Err(e) => {
                tracing::warn!("ignoring malformed tool_call block: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_single_block() {
        let text = "before\n```tool_call\n{\"tool_id\": \"x\"}\n```\nafter";
        let blocks = extract_fenced_blocks(text, "tool_call");
        assert_eq!(blocks, vec!["{\"tool_id\": \"x\"}"]);
    }

    #[test]
    fn extract_multiple_blocks() {
        let text = "```tool_call\na\n```\ntext\n```tool_call\nb\n```";
        let blocks = extract_fenced_blocks(text, "tool_call");
        assert_eq!(blocks, vec!["a", "b"]);
    }

    #[test]
    fn unterminated_block_ignored() {
        let text = "```tool_call\nno closing fence";
        assert!(extract_fenced_blocks(text, "tool_call").is_empty());
    }

    #[test]
    fn no_blocks_in_plain_text() {
        assert!(extract_fenced_blocks("just prose", "tool_call").is_empty());
    }

    #[test]
    fn parse_tool_call_with_params() {
        let text = r#"```tool_call
{"tool_id": "retrieve_documents", "params": {"query": "chunk overlap"}}
```"#;
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_id, "retrieve_documents");
        assert_eq!(calls[0].params.get("query").unwrap(), "chunk overlap");
    }

    #[test]
    fn malformed_block_is_skipped() {
        let text = "```tool_call\nnot json\n```\n```tool_call\n{\"tool_id\": \"ok\"}\n```";
        let calls = parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_id, "ok");
    }

    #[test]
    fn deserialize_params_valid() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct P {
            query: String,
        }
        let mut map = HashMap::new();
        map.insert("query".to_owned(), serde_json::json!("test"));
        let p: P = deserialize_params(&map).unwrap();
        assert_eq!(p.query, "test");
    }

    #[test]
    fn deserialize_params_missing_required_field() {
        #[derive(Debug, serde::Deserialize)]
        struct P {
            #[allow(dead_code)]
            query: String,
        }
        let map: HashMap<String, serde_json::Value> = HashMap::new();
        let err = deserialize_params::<P>(&map).unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams { .. }));
    }

    #[test]
    fn registry_find_and_format() {
        let registry = ToolRegistry::from_definitions(vec![retrieval::retrieval_tool_def()]);
        assert!(registry.find("retrieve_documents").is_some());
        assert!(registry.find("unknown").is_none());

        let prompt = registry.format_for_prompt();
        assert!(prompt.contains("## retrieve_documents"));
        assert!(prompt.contains("query"));
        assert!(prompt.starts_with("<tools>"));
        assert!(prompt.ends_with("</tools>"));
    }

    #[test]
    fn empty_registry_formats_empty_catalog() {
        let registry = ToolRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.format_for_prompt(), "<tools>\n</tools>");
    }
}
