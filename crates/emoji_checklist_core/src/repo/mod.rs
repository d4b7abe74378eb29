//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define settings data-access contracts.
//! - Isolate SQLite query details from the configuration service.
//!
//! # Invariants
//! - Writes persist only validated settings snapshots.
//! - Reads reject invalid persisted state instead of masking it.

pub mod settings_repo;
