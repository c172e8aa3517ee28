//! Core use-case services.
//!
//! # Responsibility
//! - Expose the entry points transport layers call (create, add, delete,
//!   background, state).
//! - Keep transport layers decoupled from storage and rollover details.

pub mod hopper_service;
pub mod ticker;
