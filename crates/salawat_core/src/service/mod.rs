//! Counter use-case services.
//!
//! # Responsibility
//! - Own counter state and feedback events behind use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod counter_service;
pub mod feedback_service;
pub mod reset_gate;
