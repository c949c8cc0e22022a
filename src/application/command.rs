//! # Command
//!
//! A named, inhibitable action bound to a handler and an owning module.
//! Dispatch evaluates the inhibitor chain in registration order, then fires
//! the handler without awaiting it.

use anyhow::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::application::context::Context;

pub type CommandHandler = Arc<dyn Fn(Context) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Predicate that can veto execution. `Ok(false)` inhibits; an `Err` counts
/// as passing and the chain continues.
pub type Inhibitor = Arc<dyn Fn(Context) -> BoxFuture<'static, Result<bool>> + Send + Sync>;

/// Wrap an async closure into a [`CommandHandler`].
pub fn handler<F, Fut>(f: F) -> CommandHandler
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Wrap an async closure into an [`Inhibitor`].
pub fn inhibitor<F, Fut>(f: F) -> Inhibitor
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Passes only when the context has a resolvable guild.
pub fn guild_only() -> Inhibitor {
    inhibitor(|ctx: Context| async move { Ok(ctx.origin().guild_id.is_some()) })
}

/// Passes only for direct/ephemeral channels.
pub fn dm_only() -> Inhibitor {
    inhibitor(|ctx: Context| async move { Ok(ctx.origin().guild_id.is_none()) })
}

#[derive(Default, Clone)]
pub struct CommandOptions {
    pub disabled: bool,
    pub aliases: Vec<String>,
    pub inhibitors: Vec<Inhibitor>,
}

/// Declared definition of a command, consumed once at module construction.
pub struct CommandSpec {
    pub name: String,
    pub handler: CommandHandler,
    pub options: CommandOptions,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, handler: CommandHandler) -> Self {
        Self {
            name: name.into(),
            handler,
            options: CommandOptions::default(),
        }
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.options.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn inhibitor(mut self, inhibitor: Inhibitor) -> Self {
        self.options.inhibitors.push(inhibitor);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.options.disabled = true;
        self
    }
}

pub struct Command {
    name: String,
    aliases: Vec<String>,
    module: Mutex<String>,
    handler: CommandHandler,
    disabled: AtomicBool,
    inhibitors: Mutex<Vec<Inhibitor>>,
}

impl Command {
    pub fn from_spec(module: &str, spec: CommandSpec) -> Arc<Self> {
        Arc::new(Self {
            name: spec.name,
            aliases: spec.options.aliases,
            module: Mutex::new(module.to_string()),
            handler: spec.handler,
            disabled: AtomicBool::new(spec.options.disabled),
            inhibitors: Mutex::new(spec.options.inhibitors),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Name of the owning module, for logging.
    pub async fn module(&self) -> String {
        self.module.lock().await.clone()
    }

    /// Re-point the non-owning module back-reference. Used when a command is
    /// adopted by a different module at runtime.
    pub(crate) async fn rebind(&self, module: &str) {
        *self.module.lock().await = module.to_string();
    }

    /// Advisory flag; dispatch checks it fail-closed before the inhibitors.
    pub fn disable(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }

    pub fn enable(&self) {
        self.disabled.store(false, Ordering::SeqCst);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    /// Append to the inhibitor chain. Append-only; there is no removal.
    pub async fn use_inhibitor(&self, inhibitor: Inhibitor) {
        self.inhibitors.lock().await.push(inhibitor);
    }

    /// Sole dispatch entry point. Evaluates the inhibitor chain, then spawns
    /// the handler fire-and-forget: the caller never awaits handler
    /// completion, so handlers contain their own failures.
    pub async fn execute(&self, ctx: Context) {
        if self.is_disabled() {
            tracing::debug!(command = %self.name, "Dropping dispatch of disabled command");
            return;
        }
        if !self.call_inhibitors(&ctx).await {
            tracing::debug!(command = %self.name, "Command inhibited");
            return;
        }
        let handler = self.handler.clone();
        let name = self.name.clone();
        tokio::spawn(async move {
            if let Err(e) = handler(ctx).await {
                tracing::error!(command = %name, "Command handler failed: {e:#}");
            }
        });
    }

    /// Runs inhibitors strictly in registration order, short-circuiting on the
    /// first `Ok(false)`. An inhibitor `Err` is treated as passing and the
    /// chain continues.
    async fn call_inhibitors(&self, ctx: &Context) -> bool {
        let chain: Vec<Inhibitor> = self.inhibitors.lock().await.clone();
        for inhibitor in chain {
            match inhibitor(ctx.clone()).await {
                Ok(true) => {}
                Ok(false) => return false,
                Err(_) => {}
            }
        }
        true
    }
}
