//! Persistence port and thread-level business rules.

pub mod repository;
pub mod thread;
