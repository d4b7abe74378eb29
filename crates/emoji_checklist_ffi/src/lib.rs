//! Flutter-facing bindings for the emoji checklist core.

pub mod api;
