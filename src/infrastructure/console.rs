//! # Console Transport
//!
//! Implements the `Transport` trait over stdin/stdout so the bot can be
//! driven from a terminal: every input line becomes a `MessageCreate` from a
//! synthetic console origin, and outbound messages are printed.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::config::GatewayConfig;
use crate::domain::traits::Transport;
use crate::domain::types::{GatewayEvent, Message, Origin};

pub struct ConsoleTransport {
    events: broadcast::Sender<GatewayEvent>,
    origin: Origin,
    operator: String,
    next_id: AtomicU64,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleTransport {
    pub fn new(config: &GatewayConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            events,
            origin: Origin::guild(config.channel.clone(), config.guild.clone()),
            operator: config.operator.clone(),
            next_id: AtomicU64::new(1),
            reader: Mutex::new(None),
        }
    }

    fn next_message_id(&self, kind: &str) -> String {
        format!("{kind}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn connect(&self) -> Result<()> {
        let events = self.events.clone();
        let origin = self.origin.clone();
        let operator = self.operator.clone();

        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut n: u64 = 0;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        n += 1;
                        let _ = events.send(GatewayEvent::MessageCreate(Message {
                            id: format!("in-{n}"),
                            origin: origin.clone(),
                            author_id: operator.clone(),
                            content: line,
                        }));
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = events.send(GatewayEvent::Error(format!("stdin read failed: {e}")));
                        break;
                    }
                }
            }
        });
        *self.reader.lock().await = Some(handle);
        let _ = self.events.send(GatewayEvent::Ready);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    async fn create_message(&self, channel_id: &str, content: &str) -> Result<String> {
        let id = self.next_message_id("out");
        println!("[{channel_id}] {content}");
        Ok(id)
    }

    async fn edit_message(&self, channel_id: &str, message_id: &str, content: &str) -> Result<()> {
        println!("[{channel_id}] (edit {message_id}) {content}");
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        println!("[{channel_id}] (deleted {message_id})");
        Ok(())
    }

    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        println!("[{channel_id}] (react {emoji} on {message_id})");
        Ok(())
    }

    async fn remove_reactions(&self, channel_id: &str, message_id: &str) -> Result<()> {
        println!("[{channel_id}] (reactions cleared on {message_id})");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }
}
