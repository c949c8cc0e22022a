//! # Interface Layer
//!
//! Concrete modules shipped with the bot. Each module declares its commands
//! and tasks as data and is registered through `modules::all()`.

pub mod modules;
