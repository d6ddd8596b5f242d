/// A member's XP ledger record for one guild.
///
/// `xp` counts progress within the current level; `total_xp` is the lifetime
/// total and never decreases outside an explicit reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpRecord {
    pub guild_id: u64,
    pub user_id: u64,
    pub level: i32,
    pub xp: i64,
    pub total_xp: i64,
}

impl XpRecord {
    /// Converts an entity model to a domain model at the repository boundary.
    pub fn from_entity(entity: entity::users::Model) -> Self {
        Self {
            guild_id: entity.guild_id as u64,
            user_id: entity.user_id as u64,
            level: entity.level,
            xp: entity.xp,
            total_xp: entity.total_xp,
        }
    }

    /// A record for a member with no ledger row yet: level 0, no XP.
    pub fn fresh(guild_id: u64, user_id: u64) -> Self {
        Self {
            guild_id,
            user_id,
            level: 0,
            xp: 0,
            total_xp: 0,
        }
    }
}
