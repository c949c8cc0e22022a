//! # Orchestrator
//!
//! Owns the set of modules, sequences their lifecycle phases, owns connection
//! state, and wires the registry to the transport's event stream.

use anyhow::{Result, bail};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

use crate::application::module::{Module, ModuleDef};
use crate::application::registry::CommandRegistry;
use crate::domain::traits::{SettingsProvider, Transport};
use crate::domain::types::{ConnectionState, GatewayEvent};

pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    registry: Arc<CommandRegistry>,
    modules: Mutex<Vec<Arc<Module>>>,
    state: Mutex<ConnectionState>,
}

impl Orchestrator {
    /// The settings provider is fixed here and never swapped while modules
    /// are live.
    pub fn new(transport: Arc<dyn Transport>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            transport,
            registry: Arc::new(CommandRegistry::new(settings)),
            modules: Mutex::new(Vec::new()),
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    pub fn registry(&self) -> Arc<CommandRegistry> {
        self.registry.clone()
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.state.lock().await = state;
    }

    async fn module_snapshot(&self) -> Vec<Arc<Module>> {
        self.modules.lock().await.clone()
    }

    /// Construct and attach modules in call order. Each module's commands are
    /// bulk-registered immediately. Registering under an existing module name
    /// replaces the prior module in place (last registration wins). Modules
    /// added after the orchestrator is ready run their init hooks right away,
    /// in sequence.
    pub async fn add_modules(&self, defs: Vec<Arc<dyn ModuleDef>>) {
        for def in defs {
            let module = Module::new(def, self.registry.clone());
            self.registry.register_module(&module).await;
            tracing::info!(module = %module.name(), "Module added");
            {
                let mut modules = self.modules.lock().await;
                match modules.iter().position(|m| m.name() == module.name()) {
                    Some(pos) => modules[pos] = module.clone(),
                    None => modules.push(module.clone()),
                }
            }
            if self.state().await == ConnectionState::Ready {
                Self::run_hook(&module, "will_init", module.will_init().await);
                Self::run_hook(&module, "did_init", module.did_init().await);
            }
        }
    }

    fn run_hook(module: &Module, hook: &str, result: Result<()>) {
        if let Err(e) = result {
            tracing::error!(module = %module.name(), hook = %hook, "Lifecycle hook failed: {e:#}");
        }
    }

    /// Await `will_init` of every module, strictly in insertion order. A
    /// failing hook is logged and does not block the remaining modules.
    pub async fn pre_initialize_modules(&self) {
        for module in self.module_snapshot().await {
            Self::run_hook(&module, "will_init", module.will_init().await);
        }
    }

    /// Await `did_init` of every module, strictly in insertion order.
    pub async fn post_initialize_modules(&self) {
        for module in self.module_snapshot().await {
            Self::run_hook(&module, "did_init", module.did_init().await);
        }
    }

    /// Task startup is detached: offsets and first triggers must never hold
    /// up the dispatch loop, which would also let the event buffer lag.
    async fn start_all_tasks(&self) {
        let modules = self.module_snapshot().await;
        tokio::spawn(async move {
            for module in modules {
                module.start_tasks().await;
            }
        });
    }

    /// Connect and drive the gateway event loop: pre-init, connect, wait for
    /// `Ready`, post-init, start tasks, then dispatch messages until the
    /// event stream closes.
    pub async fn run(&self) -> Result<()> {
        self.set_state(ConnectionState::Connecting).await;
        self.pre_initialize_modules().await;

        let mut rx = self.transport.subscribe();
        self.transport.connect().await?;

        loop {
            match rx.recv().await {
                Ok(GatewayEvent::Ready) => break,
                Ok(GatewayEvent::Error(e)) => tracing::error!("Gateway error: {e}"),
                Ok(GatewayEvent::Warn(w)) => tracing::warn!("Gateway warning: {w}"),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    bail!("Gateway closed before becoming ready")
                }
            }
        }

        self.set_state(ConnectionState::Ready).await;
        tracing::info!("Gateway ready");
        self.post_initialize_modules().await;
        self.start_all_tasks().await;

        loop {
            match rx.recv().await {
                Ok(GatewayEvent::MessageCreate(message)) => {
                    self.registry.dispatch(self.transport.clone(), message).await;
                }
                Ok(GatewayEvent::Ready) => {
                    // Transport-driven reconnect completed.
                    self.set_state(ConnectionState::Ready).await;
                }
                Ok(GatewayEvent::Error(e)) => tracing::error!("Gateway error: {e}"),
                Ok(GatewayEvent::Warn(w)) => tracing::warn!("Gateway warning: {w}"),
                // Reaction and deletion events are consumed by the paged
                // displays through their own subscriptions.
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Gateway event stream lagged, skipped {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        Ok(())
    }

    /// Shutdown mirrors startup: `will_unload` of all modules in order, stop
    /// every task, disconnect the transport, then `did_unload` in order.
    pub async fn shutdown(&self) {
        let modules = self.module_snapshot().await;
        for module in &modules {
            Self::run_hook(module, "will_unload", module.will_unload().await);
        }
        for module in &modules {
            module.stop_tasks().await;
        }
        if let Err(e) = self.transport.disconnect().await {
            tracing::error!("Transport disconnect failed: {e:#}");
        }
        for module in &modules {
            Self::run_hook(module, "did_unload", module.did_unload().await);
        }
        self.set_state(ConnectionState::Disconnected).await;
    }
}
