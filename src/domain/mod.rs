//! # Domain Layer
//!
//! Core definitions, types, and traits that define the business domain of the
//! framework. Independent of any specific chat gateway, serving as the contract
//! for the other layers.

pub mod config;
pub mod traits;
pub mod types;
