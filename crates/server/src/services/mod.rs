//! Business logic services.
//!
//! - `claim` - The claim saga (reserve, confirm donor, notify owners)
//! - `email` - Transactional email providers and message rendering

pub mod claim;
pub mod email;
