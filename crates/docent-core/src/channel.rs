use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Incoming message from a channel.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub text: String,
}

/// Bidirectional communication channel for the agent.
pub trait Channel: Send {
    /// Receive the next message. Returns `None` on EOF or shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn recv(&mut self)
    -> impl Future<Output = Result<Option<ChannelMessage>, ChannelError>> + Send;

    /// Send a text response.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn send(&mut self, text: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

/// Channel that reads from stdin and writes to stdout.
#[derive(Debug)]
pub struct CliChannel {
    name: String,
}

impl CliChannel {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Channel for CliChannel {
    async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        loop {
            let line = tokio::task::spawn_blocking(read_prompt_line)
                .await
                .map_err(|e| ChannelError::Other(e.to_string()))??;

            let Some(line) = line else { return Ok(None) };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "exit" || trimmed == "quit" {
                return Ok(None);
            }
            return Ok(Some(ChannelMessage {
                text: trimmed.to_owned(),
            }));
        }
    }

    async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        println!("{}: {text}\n", self.name);
        Ok(())
    }
}

fn read_prompt_line() -> Result<Option<String>, std::io::Error> {
    print!("you: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    let read = std::io::stdin().read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
