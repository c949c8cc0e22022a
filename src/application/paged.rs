//! # Paged Embed
//!
//! A multi-page display synchronized to reaction events from one designated
//! user. The instance owns a live message once initialized and listens to the
//! gateway for reactions on it and for its external deletion.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::traits::Transport;
use crate::domain::types::GatewayEvent;

pub const CONTROL_PREV: &str = "⬅️";
pub const CONTROL_NEXT: &str = "➡️";
pub const CONTROL_CLOSE: &str = "❌";

/// One page of a paged display.
#[derive(Debug, Clone)]
pub struct Page {
    pub title: Option<String>,
    pub body: String,
}

impl Page {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            title: None,
            body: body.into(),
        }
    }

    pub fn titled(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: body.into(),
        }
    }

    fn placeholder() -> Self {
        Self::titled("Empty", "Nothing to display yet.")
    }
}

struct PagedInner {
    pages: Vec<Page>,
    index: usize,
    message_id: Option<String>,
    destroyed: bool,
    listener: Option<JoinHandle<()>>,
    expiry: Option<JoinHandle<()>>,
}

impl PagedInner {
    fn render(&self) -> String {
        let total = self.pages.len();
        let page = &self.pages[self.index];
        let mut out = String::new();
        if let Some(title) = &page.title {
            out.push_str(&format!("**{}**\n\n", title));
        }
        out.push_str(&page.body);
        out.push_str(&format!("\n\n_Page {}/{}_", self.index + 1, total));
        out
    }
}

pub struct PagedEmbed {
    transport: Arc<dyn Transport>,
    channel_id: String,
    user_id: String,
    inner: Mutex<PagedInner>,
}

impl PagedEmbed {
    /// Create an uninitialized paged display. If `expiry` is given, a timer
    /// armed now destroys the instance once the deadline elapses.
    pub fn new(
        transport: Arc<dyn Transport>,
        channel_id: String,
        user_id: String,
        expiry: Option<Duration>,
    ) -> Arc<Self> {
        let embed = Arc::new(Self {
            transport,
            channel_id,
            user_id,
            inner: Mutex::new(PagedInner {
                pages: Vec::new(),
                index: 0,
                message_id: None,
                destroyed: false,
                listener: None,
                expiry: None,
            }),
        });
        if let Some(after) = expiry {
            let weak = Arc::downgrade(&embed);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(after).await;
                if let Some(embed) = weak.upgrade() {
                    embed.destroy(None).await;
                }
            });
            // No other handle exists yet, so the lock is uncontended.
            if let Ok(mut inner) = embed.inner.try_lock() {
                inner.expiry = Some(handle);
            }
        }
        embed
    }

    /// Append pages. Safe before or after init; a no-op once destroyed.
    pub async fn add_pages(&self, pages: Vec<Page>) {
        let mut inner = self.inner.lock().await;
        if inner.destroyed {
            return;
        }
        inner.pages.extend(pages);
    }

    /// Create the visible message on the first page (placeholder if none was
    /// added) and start listening for reaction and deletion events.
    pub async fn init(self: &Arc<Self>) -> Result<()> {
        let content = {
            let mut inner = self.inner.lock().await;
            if inner.destroyed || inner.message_id.is_some() {
                return Ok(());
            }
            if inner.pages.is_empty() {
                inner.pages.push(Page::placeholder());
            }
            inner.render()
        };
        let id = self.transport.create_message(&self.channel_id, &content).await?;
        let mut inner = self.inner.lock().await;
        if inner.destroyed {
            // Destroyed while the create was in flight; drop the orphan.
            let transport = self.transport.clone();
            let channel_id = self.channel_id.clone();
            tokio::spawn(async move {
                let _ = transport.delete_message(&channel_id, &id).await;
            });
            return Ok(());
        }
        inner.message_id = Some(id);
        let rx = self.transport.subscribe();
        let me = self.clone();
        inner.listener = Some(tokio::spawn(me.listen(rx)));
        Ok(())
    }

    /// Attach the standard navigation reactions to the live message.
    pub async fn add_default_controls(&self) -> Result<()> {
        let message_id = {
            let inner = self.inner.lock().await;
            if inner.destroyed {
                return Ok(());
            }
            match &inner.message_id {
                Some(id) => id.clone(),
                None => return Ok(()),
            }
        };
        for emoji in [CONTROL_PREV, CONTROL_NEXT, CONTROL_CLOSE] {
            self.transport
                .add_reaction(&self.channel_id, &message_id, emoji)
                .await?;
        }
        Ok(())
    }

    /// Advance one page, wrapping past the end. The visual update is
    /// fire-and-forget.
    pub async fn next_page(self: &Arc<Self>) {
        {
            let mut inner = self.inner.lock().await;
            if inner.destroyed || inner.pages.is_empty() {
                return;
            }
            inner.index = (inner.index + 1) % inner.pages.len();
        }
        let me = self.clone();
        tokio::spawn(async move { me.refresh().await });
    }

    /// Retreat one page, wrapping before the start.
    pub async fn previous_page(self: &Arc<Self>) {
        {
            let mut inner = self.inner.lock().await;
            if inner.destroyed || inner.pages.is_empty() {
                return;
            }
            inner.index = (inner.index + inner.pages.len() - 1) % inner.pages.len();
        }
        let me = self.clone();
        tokio::spawn(async move { me.refresh().await });
    }

    /// Re-render the current page into the live message. A no-op when
    /// uninitialized or destroyed; edit failures are logged, not surfaced,
    /// since the message may have been externally deleted concurrently.
    pub async fn refresh(&self) {
        let (message_id, content) = {
            let inner = self.inner.lock().await;
            if inner.destroyed {
                return;
            }
            match &inner.message_id {
                Some(id) => (id.clone(), inner.render()),
                None => return,
            }
        };
        if let Err(e) = self
            .transport
            .edit_message(&self.channel_id, &message_id, &content)
            .await
        {
            tracing::warn!(channel = %self.channel_id, "Paged refresh failed: {e:#}");
        }
    }

    /// Destroy the display. With a reason the reactions are cleared and the
    /// message edited to show the reason text; without one the message is
    /// deleted outright. Idempotent; every public method is a no-op after.
    pub async fn destroy(&self, reason: Option<&str>) {
        self.teardown(true, reason).await;
    }

    pub async fn is_destroyed(&self) -> bool {
        self.inner.lock().await.destroyed
    }

    pub async fn current_page(&self) -> usize {
        self.inner.lock().await.index
    }

    pub async fn page_count(&self) -> usize {
        self.inner.lock().await.pages.len()
    }

    pub async fn message_id(&self) -> Option<String> {
        self.inner.lock().await.message_id.clone()
    }

    async fn owns_message(&self, message_id: &str) -> bool {
        self.inner.lock().await.message_id.as_deref() == Some(message_id)
    }

    async fn listen(self: Arc<Self>, mut rx: broadcast::Receiver<GatewayEvent>) {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if self.is_destroyed().await {
                break;
            }
            match event {
                GatewayEvent::ReactionAdd(r) | GatewayEvent::ReactionRemove(r) => {
                    if !self.owns_message(&r.message_id).await || r.user_id != self.user_id {
                        continue;
                    }
                    match r.emoji.as_str() {
                        CONTROL_PREV => self.previous_page().await,
                        CONTROL_NEXT => self.next_page().await,
                        CONTROL_CLOSE => {
                            self.destroy(None).await;
                            break;
                        }
                        _ => {}
                    }
                }
                GatewayEvent::MessageDelete { message_id, .. } => {
                    if self.owns_message(&message_id).await {
                        // The message is already gone; tear down without
                        // touching the transport.
                        self.teardown(false, None).await;
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    async fn teardown(&self, touch_message: bool, reason: Option<&str>) {
        let (message_id, listener, expiry) = {
            let mut inner = self.inner.lock().await;
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            (
                inner.message_id.take(),
                inner.listener.take(),
                inner.expiry.take(),
            )
        };
        if let Some(handle) = expiry {
            handle.abort();
        }
        if touch_message {
            if let Some(id) = message_id {
                let result = match reason {
                    Some(text) => {
                        if let Err(e) = self.transport.remove_reactions(&self.channel_id, &id).await
                        {
                            tracing::warn!(channel = %self.channel_id, "Failed to clear reactions: {e:#}");
                        }
                        self.transport.edit_message(&self.channel_id, &id, text).await
                    }
                    None => self.transport.delete_message(&self.channel_id, &id).await,
                };
                if let Err(e) = result {
                    tracing::warn!(channel = %self.channel_id, "Paged teardown failed: {e:#}");
                }
            }
        }
        // Aborted last: teardown may be running on the listener task itself.
        if let Some(handle) = listener {
            handle.abort();
        }
    }
}
