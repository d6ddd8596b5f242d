//! Factories for creating test entities with sensible defaults.

pub mod xp_record;

pub use xp_record::{create_xp_record, create_xp_record_with};
