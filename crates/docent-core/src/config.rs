use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_INSTRUCTIONS: &str = "\
You are an intelligent AI assistant with access to a knowledge base.

When answering questions:
1. Use the retrieve_documents tool to search for relevant information in the knowledge base
2. Base your answers on the retrieved passages when available
3. If information is not in the knowledge base, use your general knowledge but clearly state this
4. Be concise, accurate, and helpful
5. Cite the source documents when possible

Always prioritize accuracy over speculation.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_instructions")]
    pub instructions: String,
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusConfig {
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_top_k")]
    pub top_k: u64,
}

fn default_agent_name() -> String {
    "docent".into()
}

fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.into()
}

fn default_max_tool_iterations() -> usize {
    4
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_model() -> String {
    "llama3.1".into()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("./data/pdfs")
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_separators() -> Vec<String> {
    vec!["\n\n".into(), "\n".into(), " ".into()]
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("./vectorstore")
}

fn default_collection() -> String {
    "docent_corpus".into()
}

fn default_top_k() -> u64 {
    crate::tools::retrieval::DEFAULT_TOP_K
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            instructions: default_instructions(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: default_separators(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist_dir: default_persist_dir(),
            collection: default_collection(),
            top_k: default_top_k(),
        }
    }
}

impl Config {
    /// Parse a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Parse a config file, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.corpus.chunk_size == 0 {
            return Err(ConfigError::Invalid("corpus.chunk_size must be > 0".into()));
        }
        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            return Err(ConfigError::Invalid(
                "corpus.chunk_overlap must be smaller than corpus.chunk_size".into(),
            ));
        }
        if self.store.top_k == 0 {
            return Err(ConfigError::Invalid("store.top_k must be > 0".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".into()));
        }
        if self.llm.embedding_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "llm.embedding_model must not be empty".into(),
            ));
        }
        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "store.collection must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.store.top_k, 6);
        assert_eq!(config.corpus.chunk_size, 1000);
        assert_eq!(config.corpus.chunk_overlap, 200);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.agent.name, "docent");
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: Config = toml::from_str(
            r#"
            [store]
            top_k = 3

            [llm]
            model = "mistral:7b"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.top_k, 3);
        assert_eq!(config.llm.model, "mistral:7b");
        assert_eq!(config.llm.embedding_model, "nomic-embed-text");
        assert_eq!(config.corpus.chunk_size, 1000);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut config = Config::default();
        config.corpus.chunk_overlap = config.corpus.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_top_k_rejected() {
        let mut config = Config::default();
        config.store.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_model_rejected() {
        let mut config = Config::default();
        config.llm.model = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.agent.name, "docent");
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docent.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
