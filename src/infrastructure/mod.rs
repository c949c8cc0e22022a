//! # Infrastructure Layer
//!
//! Implements the traits defined in the Domain layer (Transport,
//! SettingsProvider) for concrete backends.

pub mod console;
pub mod loopback;
pub mod settings;
