//! Infrastructure for Parley: SQLite persistence, configuration loading,
//! and the OpenRouter-backed inference and summary providers.

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod summary;
