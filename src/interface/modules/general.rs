//! # General Module
//!
//! Baseline commands every deployment wants: `ping`, `about`, and a paged
//! `help` display, plus a heartbeat task that logs uptime.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::application::command::{CommandSpec, guild_only, handler};
use crate::application::module::ModuleDef;
use crate::application::paged::Page;
use crate::application::task::{TaskOptions, TaskSpec, task_handler};
use crate::domain::config::AppConfig;

pub struct General {
    started: DateTime<Utc>,
    paged_expiry: Option<Duration>,
}

impl General {
    pub fn new(config: &AppConfig) -> Arc<Self> {
        Arc::new(Self {
            started: Utc::now(),
            paged_expiry: config.system.paged_expiry_secs.map(Duration::from_secs),
        })
    }

    fn help_pages() -> Vec<Page> {
        vec![
            Page::titled(
                "🤖 General",
                "* ping: Check the bot is alive\n* about: Version and uptime\n* help: This display",
            ),
            Page::titled(
                "🧭 Navigation",
                "Use the ⬅️ ➡️ reactions to turn pages and ❌ to close.\nOnly the requesting user's reactions are honored.",
            ),
            Page::titled(
                "⚙️ Prefix",
                "Commands are resolved by stripping the origin's configured prefix and matching the first word against the alias table.",
            ),
        ]
    }
}

#[async_trait]
impl ModuleDef for General {
    fn name(&self) -> &str {
        "general"
    }

    fn commands(self: Arc<Self>) -> Vec<CommandSpec> {
        let started = self.started;
        let expiry = self.paged_expiry;

        vec![
            CommandSpec::new(
                "ping",
                handler(|ctx| async move {
                    ctx.reply("🏓 Pong!").await.map(|_| ())
                }),
            )
            .aliases(&["p"]),
            CommandSpec::new(
                "about",
                handler(move |ctx| async move {
                    let uptime = Utc::now().signed_duration_since(started);
                    ctx.reply(&format!(
                        "**Ensemble** v{}\nUp for {} minutes.",
                        env!("CARGO_PKG_VERSION"),
                        uptime.num_minutes()
                    ))
                    .await
                    .map(|_| ())
                }),
            ),
            CommandSpec::new(
                "help",
                handler(move |ctx| async move {
                    let embed = ctx.paged(Self::help_pages(), expiry).await;
                    embed.init().await?;
                    embed.add_default_controls().await?;
                    Ok(())
                }),
            )
            .aliases(&["h", "commands"])
            .inhibitor(guild_only()),
        ]
    }

    fn tasks(self: Arc<Self>) -> Vec<TaskSpec> {
        let started = self.started;
        vec![TaskSpec::new(
            "heartbeat",
            task_handler(move || async move {
                let uptime = Utc::now().signed_duration_since(started);
                tracing::info!("Heartbeat: up {} minutes", uptime.num_minutes());
                Ok(())
            }),
            TaskOptions {
                run_every: Duration::from_secs(300),
                run_for: 0,
                offset: Duration::from_secs(60),
            },
        )]
    }

    async fn did_init(&self) -> Result<()> {
        tracing::info!("General module ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::module::Module;
    use crate::application::registry::CommandRegistry;
    use crate::domain::types::{Message, Origin};
    use crate::infrastructure::loopback::LoopbackTransport;
    use crate::infrastructure::settings::StaticSettings;

    fn test_config() -> AppConfig {
        serde_yaml::from_str("services:\n  gateway:\n    token: t\n").unwrap()
    }

    #[tokio::test]
    async fn test_ping_replies() {
        let registry = Arc::new(CommandRegistry::new(Arc::new(StaticSettings::new(
            "!".to_string(),
        ))));
        let module = Module::new(General::new(&test_config()), registry.clone());
        registry.register_module(&module).await;

        let transport = Arc::new(LoopbackTransport::new());
        let message = Message {
            id: "m1".to_string(),
            origin: Origin::guild("chan-1", "guild-1"),
            author_id: "user-1".to_string(),
            content: "!p".to_string(),
        };
        registry.dispatch(transport.clone(), message).await;

        // The handler is fire-and-forget; give it a chance to run.
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        let stored = transport.message("msg-1").await.unwrap();
        assert!(stored.content.contains("Pong"));
    }

    #[tokio::test]
    async fn test_help_is_guild_only() {
        let registry = Arc::new(CommandRegistry::new(Arc::new(StaticSettings::new(
            "!".to_string(),
        ))));
        let module = Module::new(General::new(&test_config()), registry.clone());
        registry.register_module(&module).await;

        let help = module.command("help").await.unwrap();
        let transport = Arc::new(LoopbackTransport::new());
        let ctx = crate::application::context::Context::new(
            transport.clone(),
            Message {
                id: "m1".to_string(),
                origin: Origin::direct("dm-1"),
                author_id: "user-1".to_string(),
                content: "!help".to_string(),
            },
            "help".to_string(),
            Vec::new(),
        );
        help.execute(ctx).await;
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert!(transport.message("msg-1").await.is_none());
    }
}
