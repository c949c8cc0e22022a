//! # Module
//!
//! A self-contained feature unit owning commands and tasks, with lifecycle
//! hooks. Module types declare their commands and tasks as explicit data via
//! [`ModuleDef`]; the runtime [`Module`] resolves those definitions once at
//! construction.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::application::command::{Command, CommandSpec};
use crate::application::registry::CommandRegistry;
use crate::application::task::{Task, TaskSpec};

/// Declared shape of a module: identity, command/task definitions, and
/// optional lifecycle hooks. All hooks default to no-ops.
#[async_trait]
pub trait ModuleDef: Send + Sync {
    /// Unique module identity across the process.
    fn name(&self) -> &str;

    fn commands(self: Arc<Self>) -> Vec<CommandSpec> {
        Vec::new()
    }

    fn tasks(self: Arc<Self>) -> Vec<TaskSpec> {
        Vec::new()
    }

    async fn will_init(&self) -> Result<()> {
        Ok(())
    }

    async fn did_init(&self) -> Result<()> {
        Ok(())
    }

    async fn will_unload(&self) -> Result<()> {
        Ok(())
    }

    async fn did_unload(&self) -> Result<()> {
        Ok(())
    }
}

/// Runtime owner of a module's commands and tasks. Constructed once by the
/// orchestrator and lives for the process lifetime.
pub struct Module {
    def: Arc<dyn ModuleDef>,
    name: String,
    registry: Arc<CommandRegistry>,
    commands: Mutex<HashMap<String, Arc<Command>>>,
    tasks: Mutex<HashMap<String, Arc<Task>>>,
    tasks_resolved: AtomicBool,
}

impl Module {
    /// Resolve the declared command definitions into the owned map. A
    /// duplicate declared name is skipped: first registration wins.
    pub fn new(def: Arc<dyn ModuleDef>, registry: Arc<CommandRegistry>) -> Arc<Self> {
        let name = def.name().to_string();
        let mut commands: HashMap<String, Arc<Command>> = HashMap::new();
        for spec in def.clone().commands() {
            if commands.contains_key(&spec.name) {
                tracing::debug!(module = %name, command = %spec.name, "Skipping duplicate command declaration");
                continue;
            }
            let command = Command::from_spec(&name, spec);
            commands.insert(command.name().to_string(), command);
        }
        Arc::new(Self {
            def,
            name,
            registry,
            commands: Mutex::new(commands),
            tasks: Mutex::new(HashMap::new()),
            tasks_resolved: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn commands(&self) -> Vec<Arc<Command>> {
        self.commands.lock().await.values().cloned().collect()
    }

    pub async fn command(&self, name: &str) -> Option<Arc<Command>> {
        self.commands.lock().await.get(name).cloned()
    }

    /// Insert or overwrite a command at runtime, rebinding its owning module
    /// and indexing it in the registry.
    pub async fn add_command(&self, command: Arc<Command>) {
        command.rebind(&self.name).await;
        self.commands
            .lock()
            .await
            .insert(command.name().to_string(), command.clone());
        self.registry.register_command(command).await;
    }

    /// Build a command from a spec and add it. Convenience over
    /// [`Module::add_command`].
    pub async fn add_command_spec(&self, spec: CommandSpec) -> Arc<Command> {
        let command = Command::from_spec(&self.name, spec);
        self.add_command(command.clone()).await;
        command
    }

    /// Resolve declared tasks on first call; later calls return the existing
    /// set without re-scanning the declarations. Resolution happens under
    /// the task map lock, so a concurrent caller blocks until the full set
    /// is in place.
    pub async fn get_tasks(&self) -> Vec<Arc<Task>> {
        let mut tasks = self.tasks.lock().await;
        if !self.tasks_resolved.swap(true, Ordering::SeqCst) {
            for spec in self.def.clone().tasks() {
                if tasks.contains_key(&spec.name) {
                    tracing::debug!(module = %self.name, task = %spec.name, "Skipping duplicate task declaration");
                    continue;
                }
                let task = Task::from_spec(&self.name, spec);
                tasks.insert(task.name().to_string(), task);
            }
        }
        tasks.values().cloned().collect()
    }

    /// Start every owned task, waiting for all first-trigger completions.
    pub async fn start_tasks(&self) {
        let tasks = self.get_tasks().await;
        join_all(tasks.iter().map(|task| {
            let task = task.clone();
            async move { task.start().await }
        }))
        .await;
    }

    pub async fn stop_tasks(&self) {
        for task in self.get_tasks().await {
            task.stop().await;
        }
    }

    pub async fn will_init(&self) -> Result<()> {
        self.def.will_init().await
    }

    pub async fn did_init(&self) -> Result<()> {
        self.def.did_init().await
    }

    pub async fn will_unload(&self) -> Result<()> {
        self.def.will_unload().await
    }

    pub async fn did_unload(&self) -> Result<()> {
        self.def.did_unload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::handler;
    use crate::application::task::{TaskOptions, task_handler};
    use crate::domain::types::{Message, Origin};
    use crate::infrastructure::settings::StaticSettings;

    struct Doubled;

    #[async_trait]
    impl ModuleDef for Doubled {
        fn name(&self) -> &str {
            "doubled"
        }

        fn commands(self: Arc<Self>) -> Vec<CommandSpec> {
            vec![
                CommandSpec::new("ping", handler(|_ctx| async { Ok(()) })).aliases(&["first"]),
                CommandSpec::new("ping", handler(|_ctx| async { Ok(()) })).aliases(&["second"]),
            ]
        }

        fn tasks(self: Arc<Self>) -> Vec<TaskSpec> {
            vec![
                TaskSpec::new("tick", task_handler(|| async { Ok(()) }), TaskOptions::default()),
                TaskSpec::new("tick", task_handler(|| async { Ok(()) }), TaskOptions::default()),
            ]
        }
    }

    fn registry() -> Arc<CommandRegistry> {
        Arc::new(CommandRegistry::new(Arc::new(StaticSettings::new(
            "!".to_string(),
        ))))
    }

    #[tokio::test]
    async fn test_duplicate_declarations_first_wins() {
        let module = Module::new(Arc::new(Doubled), registry());
        let commands = module.commands().await;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].aliases(), &["first".to_string()]);
        assert_eq!(module.get_tasks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_get_tasks_is_idempotent() {
        let module = Module::new(Arc::new(Doubled), registry());
        assert_eq!(module.get_tasks().await.len(), 1);
        assert_eq!(module.get_tasks().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_get_tasks_see_full_set() {
        let module = Module::new(Arc::new(Doubled), registry());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let module = module.clone();
                tokio::spawn(async move { module.get_tasks().await.len() })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_add_command_rebinds_and_registers() {
        let registry = registry();
        let module = Module::new(Arc::new(Doubled), registry.clone());

        let command = Command::from_spec(
            "elsewhere",
            CommandSpec::new("late", handler(|_ctx| async { Ok(()) })),
        );
        module.add_command(command.clone()).await;
        assert_eq!(command.module().await, "doubled");

        let message = Message {
            id: "m1".to_string(),
            origin: Origin::guild("chan-1", "guild-1"),
            author_id: "user-1".to_string(),
            content: "!late".to_string(),
        };
        let (found, _) = registry.find_command_from_message(&message).await.unwrap();
        assert!(Arc::ptr_eq(&found, &command));
    }
}
