//! # Command Registry
//!
//! Resolves inbound messages to commands via alias lookup and per-origin
//! prefix, then dispatches through the command's inhibitor chain.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::command::Command;
use crate::application::context::Context;
use crate::application::module::Module;
use crate::domain::traits::{SettingsProvider, Transport};
use crate::domain::types::Message;

struct RegistryTables {
    next_id: u64,
    commands: BTreeMap<u64, Arc<Command>>,
    aliases: HashMap<String, Arc<Command>>,
}

pub struct CommandRegistry {
    settings: Arc<dyn SettingsProvider>,
    tables: Mutex<RegistryTables>,
}

impl CommandRegistry {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            settings,
            tables: Mutex::new(RegistryTables {
                next_id: 0,
                commands: BTreeMap::new(),
                aliases: HashMap::new(),
            }),
        }
    }

    /// Index a command under a fresh ascending id, its primary name, and each
    /// declared alias. Re-registering an existing alias overwrites the prior
    /// target with a warning; last writer wins.
    pub async fn register_command(&self, command: Arc<Command>) -> u64 {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id;
        tables.next_id += 1;
        tables.commands.insert(id, command.clone());
        Self::index_alias(&mut tables.aliases, command.name(), &command);
        for alias in command.aliases().to_vec() {
            Self::index_alias(&mut tables.aliases, &alias, &command);
        }
        id
    }

    fn index_alias(aliases: &mut HashMap<String, Arc<Command>>, alias: &str, command: &Arc<Command>) {
        if let Some(previous) = aliases.insert(alias.to_string(), command.clone()) {
            if !Arc::ptr_eq(&previous, command) {
                tracing::warn!(
                    alias = %alias,
                    old = %previous.name(),
                    new = %command.name(),
                    "Alias re-registered, overwriting previous target"
                );
            }
        }
    }

    /// Bulk-register every command a module currently owns.
    pub async fn register_module(&self, module: &Module) {
        for command in module.commands().await {
            self.register_command(command).await;
        }
    }

    pub async fn register_alias(&self, alias: &str, command: Arc<Command>) {
        let mut tables = self.tables.lock().await;
        Self::index_alias(&mut tables.aliases, alias, &command);
    }

    pub async fn unregister_alias(&self, alias: &str) -> bool {
        self.tables.lock().await.aliases.remove(alias).is_some()
    }

    /// All registered commands in registration order.
    pub async fn commands(&self) -> Vec<Arc<Command>> {
        self.tables.lock().await.commands.values().cloned().collect()
    }

    /// Resolve a message to a command and its argument tokens. Only messages
    /// with a resolvable guild id participate in prefix resolution; lookup of
    /// the first token is exact, with no fuzzy matching or case folding.
    pub async fn find_command_from_message(
        &self,
        message: &Message,
    ) -> Option<(Arc<Command>, Vec<String>)> {
        let guild_id = message.origin.guild_id.as_deref()?;
        let prefix = self.settings.get_prefix(guild_id).await;
        let body = message.content.strip_prefix(&prefix)?;
        let mut tokens = body.split_whitespace();
        let first = tokens.next()?;
        let command = {
            let tables = self.tables.lock().await;
            tables.aliases.get(first).cloned()?
        };
        Some((command, tokens.map(str::to_string).collect()))
    }

    /// Dispatch a qualifying inbound message: build a context and hand it to
    /// the command. The handler itself is fire-and-forget.
    pub async fn dispatch(&self, transport: Arc<dyn Transport>, message: Message) {
        if let Some((command, args)) = self.find_command_from_message(&message).await {
            tracing::debug!(
                command = %command.name(),
                author = %message.author_id,
                "Dispatching command"
            );
            let ctx = Context::new(transport, message, command.name().to_string(), args);
            command.execute(ctx).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::{CommandSpec, handler};
    use crate::domain::types::Origin;
    use crate::infrastructure::loopback::LoopbackTransport;
    use crate::infrastructure::settings::StaticSettings;
    use tokio::sync::mpsc;

    fn registry() -> CommandRegistry {
        CommandRegistry::new(Arc::new(StaticSettings::new("!".to_string())))
    }

    fn noop_command(name: &str, aliases: &[&str]) -> Arc<Command> {
        Command::from_spec(
            "mod",
            CommandSpec::new(name, handler(|_ctx| async { Ok(()) })).aliases(aliases),
        )
    }

    fn guild_message(content: &str) -> Message {
        Message {
            id: "m1".to_string(),
            origin: Origin::guild("chan-1", "guild-1"),
            author_id: "user-1".to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_aliases_resolve_to_same_command() {
        let registry = registry();
        let uwu = noop_command("uwu", &["u"]);
        registry.register_command(uwu.clone()).await;

        let (by_alias, _) = registry
            .find_command_from_message(&guild_message("!u"))
            .await
            .unwrap();
        let (by_name, _) = registry
            .find_command_from_message(&guild_message("!uwu"))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&by_alias, &uwu));
        assert!(Arc::ptr_eq(&by_name, &uwu));
    }

    #[tokio::test]
    async fn test_alias_collision_last_write_wins() {
        let registry = registry();
        let uwu = noop_command("uwu", &["u"]);
        let other = noop_command("undo", &["u"]);
        registry.register_command(uwu).await;
        registry.register_command(other.clone()).await;

        let (found, _) = registry
            .find_command_from_message(&guild_message("!u"))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&found, &other));
    }

    #[tokio::test]
    async fn test_no_guild_id_resolves_nothing() {
        let registry = registry();
        registry.register_command(noop_command("ping", &[])).await;

        let mut message = guild_message("!ping");
        message.origin = Origin::direct("dm-1");
        assert!(registry.find_command_from_message(&message).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_prefix_or_unknown_alias_resolves_nothing() {
        let registry = registry();
        registry.register_command(noop_command("ping", &[])).await;

        assert!(registry
            .find_command_from_message(&guild_message("ping"))
            .await
            .is_none());
        assert!(registry
            .find_command_from_message(&guild_message("!pong"))
            .await
            .is_none());
        // No case folding.
        assert!(registry
            .find_command_from_message(&guild_message("!PING"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_remaining_tokens_become_args() {
        let registry = registry();
        registry.register_command(noop_command("echo", &[])).await;

        let (_, args) = registry
            .find_command_from_message(&guild_message("!echo  hello   world"))
            .await
            .unwrap();
        assert_eq!(args, vec!["hello".to_string(), "world".to_string()]);
    }

    #[tokio::test]
    async fn test_unregister_alias() {
        let registry = registry();
        registry.register_command(noop_command("ping", &["p"])).await;

        assert!(registry.unregister_alias("p").await);
        assert!(!registry.unregister_alias("p").await);
        assert!(registry
            .find_command_from_message(&guild_message("!p"))
            .await
            .is_none());
        // The primary name stays registered.
        assert!(registry
            .find_command_from_message(&guild_message("!ping"))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_dispatch_runs_handler_with_args() {
        let registry = registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let command = Command::from_spec(
            "mod",
            CommandSpec::new(
                "echo",
                handler(move |ctx| {
                    let tx = tx.clone();
                    async move {
                        let _ = tx.send(ctx.args().to_vec());
                        Ok(())
                    }
                }),
            ),
        );
        registry.register_command(command).await;

        let transport = Arc::new(LoopbackTransport::new());
        registry
            .dispatch(transport, guild_message("!echo one two"))
            .await;
        let args = rx.recv().await.unwrap();
        assert_eq!(args, vec!["one".to_string(), "two".to_string()]);
    }
}
