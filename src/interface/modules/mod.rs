//! # Built-in Modules
//!
//! Static registration list consumed by the orchestrator at startup. New
//! modules are added here explicitly; there is no directory scanning.

use std::sync::Arc;

use crate::application::module::ModuleDef;
use crate::domain::config::AppConfig;

pub mod general;

pub fn all(config: &AppConfig) -> Vec<Arc<dyn ModuleDef>> {
    vec![general::General::new(config)]
}
