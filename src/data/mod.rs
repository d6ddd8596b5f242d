//! Database repository layer.
//!
//! Repositories use SeaORM entity models internally and return domain models
//! to keep database structures out of the leveling engine and command glue.

pub mod xp;

pub use xp::XpRepository;

#[cfg(test)]
mod test;
