//! Core types for the gift registry.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod item;
pub mod recipients;

pub use email::{Email, EmailError};
pub use id::*;
pub use item::{Item, ItemStatus, ListedItem, NewItem, NewItemError};
pub use recipients::{RECIPIENTS_KEY, RecipientList};
