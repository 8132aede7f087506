//! Conversation orchestration and store trait definitions for Confab.
//!
//! This crate defines the "ports" (history store and LLM provider traits)
//! that the infrastructure layer implements. It depends only on
//! `confab-types` -- never on `confab-infra` or any database/IO crate.

pub mod chat;
pub mod history;
pub mod llm;
