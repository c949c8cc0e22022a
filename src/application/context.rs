//! # Context
//!
//! Per-invocation execution context passed to command handlers: a read-only
//! view of the triggering event plus reply and paged-display helpers.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::application::paged::{Page, PagedEmbed};
use crate::domain::traits::Transport;
use crate::domain::types::{Message, Origin};

#[derive(Clone)]
pub struct Context {
    transport: Arc<dyn Transport>,
    message: Message,
    command: String,
    args: Vec<String>,
    paged: Arc<Mutex<Option<Arc<PagedEmbed>>>>,
}

impl Context {
    pub fn new(
        transport: Arc<dyn Transport>,
        message: Message,
        command: String,
        args: Vec<String>,
    ) -> Self {
        Self {
            transport,
            message,
            command,
            args,
            paged: Arc::new(Mutex::new(None)),
        }
    }

    /// Identity of the user whose message triggered the command.
    pub fn author_id(&self) -> &str {
        &self.message.author_id
    }

    pub fn origin(&self) -> &Origin {
        &self.message.origin
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whitespace-split tokens after the command token.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    /// Send a message to the origin channel, returning its id.
    pub async fn reply(&self, content: &str) -> Result<String> {
        self.transport
            .create_message(&self.message.origin.channel_id, content)
            .await
    }

    /// Create a paged display owned by this context and keyed to the
    /// dispatching user's reactions. A context holds at most one; replacing
    /// the slot leaves the prior instance alive.
    pub async fn paged(&self, pages: Vec<Page>, expiry: Option<Duration>) -> Arc<PagedEmbed> {
        let embed = PagedEmbed::new(
            self.transport.clone(),
            self.message.origin.channel_id.clone(),
            self.message.author_id.clone(),
            expiry,
        );
        embed.add_pages(pages).await;
        *self.paged.lock().await = Some(embed.clone());
        embed
    }

    pub async fn current_paged(&self) -> Option<Arc<PagedEmbed>> {
        self.paged.lock().await.clone()
    }
}
