//! Configuration data model for checklist rendering.
//!
//! # Responsibility
//! - Define the settings snapshot read by the rendering core.
//! - Own configuration-boundary validation and tag normalization.
//!
//! # Invariants
//! - Global glyphs are never empty in a validated snapshot.
//! - Tag mapping keys are lowercase, non-empty and unique.

pub mod settings;
