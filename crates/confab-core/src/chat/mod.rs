//! Chat turn orchestration for Confab.
//!
//! The `ResponseOrchestrator` runs one conversational turn: it resolves the
//! persona prompt, reads the thread, calls the generation service and
//! appends both sides of the exchange, serialized per conversation key.

pub mod lock;
pub mod orchestrator;
pub mod prompt;
pub mod session;
pub mod transcript;
