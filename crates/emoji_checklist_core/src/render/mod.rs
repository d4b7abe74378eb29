//! Rendering pipeline: fragment model, surrogate binding, lifecycle scope.
//!
//! # Responsibility
//! - Turn rendered task-list fragments into glyph-surrogate views.
//! - Keep surrogate, native checkbox and backing line in agreement.
//!
//! # Invariants
//! - Processing never raises errors to the caller.
//! - Listener registrations are released with their fragment.

pub mod binder;
pub mod dom;
pub mod lifecycle;
pub mod markdown;
pub mod processor;
