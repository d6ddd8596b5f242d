//! Reward role synchronization.
//!
//! Roles are a projection of the ledger: after any level change the member's
//! reward roles are recomputed from their current level and the configured
//! role map, so a missed sync heals itself on the next level-up or explicit
//! re-sync.

use std::collections::BTreeMap;

use serenity::all::{Context, GuildId, RoleId, UserId};
use tracing::warn;

use crate::config::LevelingConfig;
use crate::error::AppError;

/// Role changes computed for one member.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RolePlan {
    pub add: Vec<u64>,
    pub remove: Vec<u64>,
    /// Desired changes the bot cannot make, typically roles at or above the
    /// bot's own top role.
    pub skipped: Vec<u64>,
}

impl RolePlan {
    pub fn is_noop(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Computes the reward role changes for a member at `level`.
///
/// With stacking enabled every reached reward role is kept; without it only
/// the highest reached role is, and lower reward roles are removed. Roles the
/// member holds that are not in the reward map are never touched. Changes the
/// `manageable` predicate rejects land in `skipped` instead of `add`/`remove`.
pub fn plan_role_updates(
    level: i32,
    level_roles: &BTreeMap<i32, u64>,
    held: &[u64],
    manageable: impl Fn(u64) -> bool,
    stacking: bool,
) -> RolePlan {
    let reached: Vec<u64> = level_roles
        .iter()
        .filter(|(required, _)| **required <= level)
        .map(|(_, role)| *role)
        .collect();

    // BTreeMap iteration is ordered by level, so the last reached entry is
    // the highest one.
    let desired: Vec<u64> = if stacking {
        reached
    } else {
        reached.last().copied().into_iter().collect()
    };

    let mut plan = RolePlan::default();

    for role in &desired {
        if held.contains(role) {
            continue;
        }
        if manageable(*role) {
            plan.add.push(*role);
        } else {
            plan.skipped.push(*role);
        }
    }

    for role in level_roles.values() {
        if !held.contains(role) || desired.contains(role) {
            continue;
        }
        if manageable(*role) {
            plan.remove.push(*role);
        } else {
            plan.skipped.push(*role);
        }
    }

    plan
}

/// Recomputes and applies a member's reward roles for their current level.
///
/// Role changes are best effort: failures are logged and returned but never
/// roll back the ledger, and unmanageable roles are skipped with a warning.
pub async fn sync_level_roles(
    ctx: &Context,
    guild_id: u64,
    user_id: u64,
    level: i32,
    config: &LevelingConfig,
) -> Result<(), AppError> {
    if config.level_roles.is_empty() {
        return Ok(());
    }

    let guild_id = GuildId::new(guild_id);
    let member = guild_id.member(ctx, UserId::new(user_id)).await?;
    let held: Vec<u64> = member.roles.iter().map(|role| role.get()).collect();

    let bot_top_position = bot_top_role_position(ctx, guild_id);
    let manageable = |role: u64| {
        role_position(ctx, guild_id, role)
            .map(|position| position < bot_top_position)
            .unwrap_or(false)
    };

    let plan = plan_role_updates(
        level,
        &config.level_roles,
        &held,
        manageable,
        config.stack_roles,
    );

    for role in &plan.skipped {
        warn!(
            guild_id = guild_id.get(),
            user_id,
            role,
            "skipping reward role the bot cannot manage"
        );
    }

    if plan.is_noop() {
        return Ok(());
    }

    if !plan.add.is_empty() {
        let roles: Vec<RoleId> = plan.add.iter().map(|role| RoleId::new(*role)).collect();
        member.add_roles(&ctx.http, &roles).await?;
    }
    if !plan.remove.is_empty() {
        let roles: Vec<RoleId> = plan.remove.iter().map(|role| RoleId::new(*role)).collect();
        member.remove_roles(&ctx.http, &roles).await?;
    }

    Ok(())
}

/// Position of the bot's highest role in the guild, from the cache.
fn bot_top_role_position(ctx: &Context, guild_id: GuildId) -> i64 {
    let bot_id = ctx.cache.current_user().id;

    let Some(guild) = guild_id.to_guild_cached(&ctx.cache) else {
        return 0;
    };
    let Some(bot) = guild.members.get(&bot_id) else {
        return 0;
    };

    bot.roles
        .iter()
        .filter_map(|role| guild.roles.get(role))
        .map(|role| i64::from(role.position))
        .max()
        .unwrap_or(0)
}

fn role_position(ctx: &Context, guild_id: GuildId, role_id: u64) -> Option<i64> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    let role = guild.roles.get(&RoleId::new(role_id))?;
    Some(i64::from(role.position))
}
