//! # Domain Types
//!
//! Value types shared across the framework: messages, reactions, origins and
//! the gateway event stream.

/// Where a message or reaction came from: a channel, optionally inside a
/// guild/workspace. Bare direct messages have no guild id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub channel_id: String,
    pub guild_id: Option<String>,
}

impl Origin {
    pub fn guild(channel_id: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            guild_id: Some(guild_id.into()),
        }
    }

    pub fn direct(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            guild_id: None,
        }
    }
}

/// An inbound chat message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub origin: Origin,
    pub author_id: String,
    pub content: String,
}

/// A reaction event scoped to one message.
#[derive(Debug, Clone)]
pub struct Reaction {
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
}

/// Events emitted by the transport's gateway connection.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready,
    MessageCreate(Message),
    ReactionAdd(Reaction),
    ReactionRemove(Reaction),
    MessageDelete {
        channel_id: String,
        message_id: String,
    },
    Error(String),
    Warn(String),
}

/// Connection lifecycle of the orchestrator. `Reconnecting` is driven by the
/// transport, not by the orchestrator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Reconnecting,
}
