//! The conversational loop: one user message in, zero or more retrievals,
//! one reply out.

use docent_llm::{LlmProvider, Message, Role};
use docent_memory::VectorStore;

use crate::channel::{Channel, ChannelError};
use crate::rag::RagStatus;
use crate::tools::retrieval::{RetrievalTool, retrieval_tool_def};
use crate::tools::{ToolDef, ToolRegistry, parse_tool_calls};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

fn format_tool_output(tool_name: &str, body: &str) -> String {
    format!("[tool output: {tool_name}]\n```\n{body}\n```")
}

fn build_system_prompt(instructions: &str, registry: &ToolRegistry) -> String {
    if registry.is_empty() {
        return instructions.to_owned();
    }
    format!(
        "{instructions}\n\n{}\n\nCall a tool by replying with a ```tool_call fenced block. \
         Reply with plain text when you are ready to answer the user.",
        registry.format_for_prompt()
    )
}

/// Whether the agent has retrieval is fixed when it is constructed; there is
/// no transition between the two configurations at runtime.
pub struct Agent<P, C, S> {
    provider: P,
    channel: C,
    messages: Vec<Message>,
    retrieval: Option<RetrievalTool<P, S>>,
    registry: ToolRegistry,
    max_tool_iterations: usize,
}

impl<P: LlmProvider, C: Channel, S: VectorStore> Agent<P, C, S> {
    #[must_use]
    pub fn new(
        provider: P,
        channel: C,
        instructions: &str,
        rag: RagStatus<P, S>,
        max_tool_iterations: usize,
    ) -> Self {
        let retrieval = match rag {
            RagStatus::Ready(tool) => {
                tracing::info!(top_k = tool.top_k(), "retrieval tool ready");
                Some(tool)
            }
            RagStatus::Missing { path } => {
                tracing::info!(
                    path = %path.display(),
                    "no vector store found; starting without retrieval (run `docent build` first)"
                );
                None
            }
            RagStatus::Failed(e) => {
                tracing::warn!("vector store is present but unusable, starting without retrieval: {e}");
                None
            }
        };

        let definitions = if retrieval.is_some() {
            vec![retrieval_tool_def()]
        } else {
            Vec::new()
        };
        let registry = ToolRegistry::from_definitions(definitions);
        let system_prompt = build_system_prompt(instructions, &registry);
        tracing::debug!(len = system_prompt.len(), "system prompt built");

        Self {
            provider,
            channel,
            messages: vec![Message::new(Role::System, system_prompt)],
            retrieval,
            registry,
            max_tool_iterations,
        }
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolDef] {
        self.registry.tools()
    }

    #[must_use]
    pub fn rag_enabled(&self) -> bool {
        self.retrieval.is_some()
    }

    /// Run the chat loop, receiving messages via the channel until EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if channel I/O fails.
    pub async fn run(&mut self) -> Result<(), AgentError> {
        while let Some(incoming) = self.channel.recv().await? {
            self.process_user_message(incoming.text).await?;
        }
        tracing::info!("channel closed, shutting down");
        Ok(())
    }

    async fn process_user_message(&mut self, text: String) -> Result<(), AgentError> {
        self.messages.push(Message::new(Role::User, text));

        for iteration in 0..self.max_tool_iterations {
            let response = match self.provider.chat(&self.messages).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("chat request failed: {e}");
                    self.channel.send(&format!("Error: {e}")).await?;
                    return Ok(());
                }
            };

            if response.trim().is_empty() {
                tracing::warn!(iteration, "received empty response from LLM");
                self.channel
                    .send("Received an empty response. Please try again.")
                    .await?;
                return Ok(());
            }

            self.messages
                .push(Message::new(Role::Assistant, response.clone()));

            let calls = parse_tool_calls(&response);
            let Some(tool) = &self.retrieval else {
                self.channel.send(&response).await?;
                return Ok(());
            };
            if calls.is_empty() {
                self.channel.send(&response).await?;
                return Ok(());
            }

            for call in &calls {
                // Tool failures go back to the model as output so the turn
                // can still end with an answer.
                let body = match tool.execute(call).await {
                    Ok(output) => output.summary,
                    Err(e) => {
                        tracing::warn!(tool = %call.tool_id, "tool execution failed: {e}");
                        format!("error: {e}")
                    }
                };
                self.messages
                    .push(Message::new(Role::User, format_tool_output(&call.tool_id, &body)));
            }
        }

        tracing::warn!(
            limit = self.max_tool_iterations,
            "tool iteration limit reached without a final answer"
        );
        self.channel
            .send("Stopping: reached the tool iteration limit without a final answer.")
            .await?;
        Ok(())
    }
}
