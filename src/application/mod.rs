//! # Application Layer
//!
//! The orchestration core: command dispatch, inhibitor chains, periodic tasks,
//! module lifecycle sequencing, and the reaction-driven paged display.

pub mod command;
pub mod context;
pub mod module;
pub mod orchestrator;
pub mod paged;
pub mod registry;
pub mod task;
