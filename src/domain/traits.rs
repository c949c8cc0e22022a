//! # Domain Traits
//!
//! Abstract interfaces for the external collaborators (chat gateway, settings).
//! Allows for pluggable implementations in the Infrastructure layer.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::types::GatewayEvent;

/// Abstract interface for a chat gateway (e.g. Matrix, Discord, Console).
///
/// Event delivery is an explicit subscription handle rather than named string
/// events; consumers keep the receiver for as long as they want updates.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the gateway connection. A `GatewayEvent::Ready` follows once the
    /// connection is live.
    async fn connect(&self) -> Result<()>;

    /// Tear down the gateway connection.
    async fn disconnect(&self) -> Result<()>;

    /// Create a message in a channel, returning its id.
    async fn create_message(&self, channel_id: &str, content: &str) -> Result<String>;

    /// Replace the content of an existing message.
    async fn edit_message(&self, channel_id: &str, message_id: &str, content: &str) -> Result<()>;

    /// Delete a message outright.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()>;

    /// Attach a reaction to a message.
    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()>;

    /// Clear every reaction from a message.
    async fn remove_reactions(&self, channel_id: &str, message_id: &str) -> Result<()>;

    /// Subscribe to the gateway event stream.
    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent>;
}

/// Per-origin settings lookup. Used solely to resolve the command prefix
/// before alias lookup; a missing entry falls back to the provider default.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get_prefix(&self, origin_id: &str) -> String;
}
