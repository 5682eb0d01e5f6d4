//! cbot — natural-language questions to shell commands, backed by a
//! persistent answer cache.
//!
//! - [`store`]: SQLite-backed answer cache, conversation log and agent memory.
//! - [`llm`]: model backend registry (hosted chat completions, local Ollama).
//! - [`session`]: cache-first orchestration and the agent loop.

pub mod actions;
pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod prompts;
pub mod session;
pub mod store;
