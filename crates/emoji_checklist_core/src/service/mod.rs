//! Core use-case services.
//!
//! # Responsibility
//! - Own the only mutation path for checklist settings.
//! - Keep host/FFI layers decoupled from storage details.

pub mod settings_service;
