//! Gift Registry Core - Shared types library.
//!
//! This crate provides common types used across all gift registry components:
//! - `server` - Public registry site and admin API
//! - `cli` - Command-line tools for migrations and registry management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Item records, type-safe IDs, emails, and recipient lists

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
