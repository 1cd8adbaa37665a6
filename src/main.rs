use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use docent_core::channel::CliChannel;
use docent_core::config::Config;
use docent_core::rag::{self, RagStatus};
use docent_core::Agent;
use docent_llm::OllamaProvider;
use docent_memory::{
    DocumentLoader, IngestionPipeline, PdfLoader, SplitterConfig, SqliteVectorStore, TextLoader,
    TextSplitter, scan_documents,
};

#[derive(Debug, Parser)]
#[command(name = "docent", version, about = "Chat with your documents through a local model")]
struct Cli {
    /// Path to the config file (default: ./docent.toml, then built-in defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest documents into the vector store (run once, offline).
    Build,
    /// Start the conversational agent (default).
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    config.validate()?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Build => build(&config).await,
        Command::Chat => chat(config).await,
    }
}

fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("DOCENT_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("docent.toml"))
}

/// Offline batch: scan the documents directory, split, embed, persist.
async fn build(config: &Config) -> anyhow::Result<()> {
    let provider = OllamaProvider::new(
        &config.llm.base_url,
        config.llm.model.clone(),
        config.llm.embedding_model.clone(),
    );
    provider
        .health_check()
        .await
        .context("Ollama health check failed")?;

    let docs_dir = &config.corpus.documents_dir;
    tracing::info!(dir = %docs_dir.display(), "loading documents");
    let pdf = PdfLoader::default();
    let text = TextLoader::default();
    let loaders: [&dyn DocumentLoader; 2] = [&pdf, &text];
    let documents = scan_documents(docs_dir, &loaders).await;

    if documents.is_empty() {
        bail!(
            "no documents found in {}; add PDF files and rerun `docent build`",
            docs_dir.display()
        );
    }
    tracing::info!(documents = documents.len(), "documents loaded");

    let persist_dir = &config.store.persist_dir;
    if persist_dir.is_dir() && std::fs::read_dir(persist_dir)?.next().is_some() {
        tracing::warn!(
            dir = %persist_dir.display(),
            "vector store already exists; rebuilding on top of it duplicates chunks \
             (clear the directory first for a clean rebuild)"
        );
    }

    let store = SqliteVectorStore::create(persist_dir)
        .await
        .context("creating vector store")?;
    let splitter = TextSplitter::new(SplitterConfig {
        chunk_size: config.corpus.chunk_size,
        chunk_overlap: config.corpus.chunk_overlap,
        separators: config.corpus.separators.clone(),
    });
    let pipeline = IngestionPipeline::new(
        splitter,
        store,
        provider,
        config.store.collection.clone(),
        config.llm.embedding_model.clone(),
    );

    let count = pipeline
        .ingest_all(&documents)
        .await
        .context("building vector store")?;
    tracing::info!(
        chunks = count,
        dir = %persist_dir.display(),
        "vector store is ready"
    );
    Ok(())
}

/// Serving path: resolve retrieval capability once, then run the chat loop.
async fn chat(config: Config) -> anyhow::Result<()> {
    let provider = OllamaProvider::new(
        &config.llm.base_url,
        config.llm.model.clone(),
        config.llm.embedding_model.clone(),
    );
    provider
        .health_check()
        .await
        .context("Ollama health check failed")?;

    let status = rag::bootstrap(&config, provider.clone()).await;
    match &status {
        RagStatus::Ready(tool) => {
            tracing::info!(top_k = tool.top_k(), "retrieval enabled");
        }
        RagStatus::Missing { path } => {
            tracing::info!(
                path = %path.display(),
                "no vector store yet; chatting without retrieval (run `docent build` to enable it)"
            );
        }
        RagStatus::Failed(e) => {
            tracing::warn!("retrieval disabled, store could not be opened: {e}");
        }
    }

    let channel = CliChannel::new(config.agent.name.clone());
    let mut agent = Agent::new(
        provider,
        channel,
        &config.agent.instructions,
        status,
        config.agent.max_tool_iterations,
    );
    agent.run().await?;
    Ok(())
}
