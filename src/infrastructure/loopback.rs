//! # Loopback Transport
//!
//! An in-memory `Transport` with a manual event injector. Messages live in a
//! map instead of going anywhere, which makes it the harness behind the async
//! tests and a useful dry-run backend.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::sync::broadcast;

use crate::domain::traits::Transport;
use crate::domain::types::{GatewayEvent, Message, Origin};

#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub channel_id: String,
    pub content: String,
    pub reactions: Vec<String>,
}

pub struct LoopbackTransport {
    events: broadcast::Sender<GatewayEvent>,
    messages: Mutex<HashMap<String, StoredMessage>>,
    next_id: AtomicU64,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            events,
            messages: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Inject a gateway event as if the wire had delivered it.
    pub fn emit(&self, event: GatewayEvent) {
        let _ = self.events.send(event);
    }

    /// Inject an inbound chat message.
    pub async fn say(&self, guild_id: Option<&str>, channel_id: &str, author_id: &str, content: &str) {
        let id = format!("in-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.emit(GatewayEvent::MessageCreate(Message {
            id,
            origin: Origin {
                channel_id: channel_id.to_string(),
                guild_id: guild_id.map(str::to_string),
            },
            author_id: author_id.to_string(),
            content: content.to_string(),
        }));
    }

    /// Snapshot a stored message, if it still exists.
    pub async fn message(&self, message_id: &str) -> Option<StoredMessage> {
        self.messages.lock().await.get(message_id).cloned()
    }

    /// Remove a message from the store without emitting anything, simulating
    /// a deletion that happened out of band.
    pub async fn delete_raw(&self, message_id: &str) {
        self.messages.lock().await.remove(message_id);
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn connect(&self) -> Result<()> {
        self.emit(GatewayEvent::Ready);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn create_message(&self, channel_id: &str, content: &str) -> Result<String> {
        let id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.messages.lock().await.insert(
            id.clone(),
            StoredMessage {
                channel_id: channel_id.to_string(),
                content: content.to_string(),
                reactions: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn edit_message(&self, _channel_id: &str, message_id: &str, content: &str) -> Result<()> {
        let mut messages = self.messages.lock().await;
        let message = messages
            .get_mut(message_id)
            .ok_or_else(|| anyhow!("Unknown message {message_id}"))?;
        message.content = content.to_string();
        Ok(())
    }

    async fn delete_message(&self, _channel_id: &str, message_id: &str) -> Result<()> {
        self.messages
            .lock()
            .await
            .remove(message_id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Unknown message {message_id}"))
    }

    async fn add_reaction(&self, _channel_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        let mut messages = self.messages.lock().await;
        let message = messages
            .get_mut(message_id)
            .ok_or_else(|| anyhow!("Unknown message {message_id}"))?;
        message.reactions.push(emoji.to_string());
        Ok(())
    }

    async fn remove_reactions(&self, _channel_id: &str, message_id: &str) -> Result<()> {
        let mut messages = self.messages.lock().await;
        let message = messages
            .get_mut(message_id)
            .ok_or_else(|| anyhow!("Unknown message {message_id}"))?;
        message.reactions.clear();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }
}
