//! Shared domain types for Parley.
//!
//! This crate contains the domain types used across the Parley chat server:
//! threads, messages, reactions, translations, summaries, session events,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod inference;
pub mod language;
