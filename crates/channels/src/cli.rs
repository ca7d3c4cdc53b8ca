//! CLI channel — interactive terminal-based chat.
//!
//! Reads lines from stdin, writes replies to stdout, and keeps the session
//! transcript in memory so the agent sees earlier turns as history.
//! Used for `medibook chat` interactive mode.

use async_trait::async_trait;
use medibook_core::channel::{Channel, ChannelId, ChannelMessage};
use medibook_core::error::ChannelError;
use std::sync::{Arc, Mutex};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

/// Sender id of the person at the terminal.
pub const LOCAL_USER: &str = "local_user";

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
    bot_id: String,
    transcript: Arc<Mutex<Vec<ChannelMessage>>>,
}

impl CliChannel {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            id: ChannelId::new("cli_session"),
            bot_id: bot_id.into(),
            transcript: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The session's channel id.
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    /// Record a message in the session transcript.
    pub fn record(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        push(&self.transcript, message)
    }
}

fn push(transcript: &Mutex<Vec<ChannelMessage>>, message: ChannelMessage) -> Result<(), ChannelError> {
    transcript
        .lock()
        .map_err(|_| ChannelError::ConnectionLost("transcript lock poisoned".into()))?
        .push(message);
    Ok(())
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn bot_id(&self) -> &str {
        &self.bot_id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();
        let transcript = self.transcript.clone();

        tokio::spawn(async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }

                        // Check for exit commands
                        if matches!(line.as_str(), "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }

                        let msg = ChannelMessage::new(channel_id.clone(), LOCAL_USER, line);
                        let msg = push(&transcript, msg.clone()).map(|()| msg);
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        warn!(error = %e, "Reading stdin failed");
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn fetch_history(
        &self,
        _channel_id: &ChannelId,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, ChannelError> {
        let transcript = self.transcript.lock().map_err(|_| ChannelError::HistoryUnavailable {
            channel: "cli".into(),
            reason: "transcript lock poisoned".into(),
        })?;
        let skip = transcript.len().saturating_sub(limit);
        Ok(transcript[skip..].to_vec())
    }

    async fn send(&self, channel_id: &ChannelId, content: &str) -> Result<(), ChannelError> {
        println!("\n{content}\n");
        self.record(ChannelMessage::new(channel_id.clone(), self.bot_id.clone(), content))
    }
}
