//! Pure checklist text rules: tag resolution, glyph policy, line anatomy.
//!
//! # Responsibility
//! - Resolve the topical tag of a checklist line.
//! - Choose the glyph for a tag and checked state.
//! - Locate the glyph slot inside a raw task line.
//!
//! # Invariants
//! - Every function here is pure: no DOM, buffer, or logging side effects.

pub mod line;
pub mod policy;
pub mod tag;
