//! Message routing, session presence, and port trait definitions for Parley.
//!
//! This crate defines the "ports" (repository, language adapter, summarizer,
//! and inference traits) that the infrastructure layer implements, plus the
//! coordination logic built on them. It depends only on `parley-types` --
//! never on `parley-infra` or any database/IO crate.

pub mod chat;
pub mod inference;
pub mod language;
pub mod router;
pub mod session;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;
