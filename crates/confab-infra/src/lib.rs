//! Infrastructure layer for Confab.
//!
//! Contains implementations of the traits defined in `confab-core`:
//! SQLite history storage, the OpenAI-compatible generation provider,
//! and the config/data-directory loader.

pub mod config;
pub mod llm;
pub mod sqlite;
