//! Editable backing buffer contracts and text reconciliation.
//!
//! # Responsibility
//! - Define the host editor surface the core writes through.
//! - Rewrite the glyph slot of one task line as a single edit.
//!
//! # Invariants
//! - Only the glyph slot of a task line is ever changed.
//! - Reconciliation reads the target line at edit time, never a cached copy.

pub mod buffer;
pub mod sync;
