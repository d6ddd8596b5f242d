//! Domain models converted from database entities at the repository boundary.

pub mod xp;

pub use xp::XpRecord;
