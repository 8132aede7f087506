//! Conversation history persistence abstractions.
//!
//! `HistoryStore` is the append-only per-key message log the orchestrator
//! reads and writes. `InMemoryHistoryStore` is a process-local
//! implementation; the durable SQLite one lives in confab-infra.

pub mod memory;
pub mod store;
