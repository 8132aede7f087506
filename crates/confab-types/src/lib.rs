//! Shared domain types for Confab.
//!
//! This crate contains the core domain types used across the Confab workspace:
//! conversation keys, messages, personas, LLM request shapes, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod persona;
