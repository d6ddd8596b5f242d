//! Leveling subsystem.
//!
//! Message activity is turned into XP in two stages to keep the hot path off
//! the database:
//!
//! 1. The message handler rate-limits awards through the [`CooldownTable`] and
//!    accumulates pending deltas in the in-memory [`XpCache`].
//! 2. A periodic flush cycle swaps the cache out atomically and reconciles
//!    each pending delta into the ledger through the [`LevelingEngine`],
//!    returning level-up notices for the caller to dispatch (role sync and
//!    congratulation messages).
//!
//! The ledger is the source of truth; reward roles are a best-effort
//! projection of it and can be re-synchronized at any time.

pub mod cache;
pub mod engine;
pub mod flush;
pub mod roles;

pub use cache::{CooldownTable, PendingXp, XpCache};
pub use engine::{xp_required_for, LevelingEngine, ReconcileResult};
pub use flush::{flush_cycle, LevelUp, MAX_FLUSH_RETRIES};
