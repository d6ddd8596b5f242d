//! Message event handler: command dispatch and XP ingestion.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serenity::all::{Context, Message};
use tracing::debug;

use crate::bot::commands;
use crate::bot::start::BotState;
use crate::config::LevelingConfig;

/// Handles message creation in a channel.
///
/// Messages starting with the command prefix are dispatched as commands;
/// everything else from a human in a guild channel is fed into the XP
/// pipeline. Ingestion never touches the database: it claims a cooldown slot
/// and records a delta into the in-memory cache, leaving persistence to the
/// flush scheduler.
pub async fn handle_message(state: &Arc<BotState>, ctx: Context, message: Message) {
    if message.author.bot {
        return;
    }
    let Some(guild_id) = message.guild_id else {
        return;
    };

    if let Some(input) = message.content.strip_prefix(&state.command_prefix) {
        commands::dispatch(state, &ctx, &message, input).await;
        return;
    }

    ingest_xp(state, &message, guild_id.get());
}

fn ingest_xp(state: &Arc<BotState>, message: &Message, guild_id: u64) {
    let config = state.leveling_config.current();
    let user_id = message.author.id.get();

    if config.blacklisted_channels.contains(&message.channel_id.get()) {
        return;
    }

    let cooldown_scope = config.cooldown_per_guild.then_some(guild_id);
    let window = Duration::from_secs(config.xp_cooldown_seconds);
    if !state.cooldowns.try_claim(user_id, cooldown_scope, window) {
        return;
    }

    let base = rand::rng().random_range(config.xp_range.min..=config.xp_range.max);
    let member_roles: Vec<u64> = message
        .member
        .as_ref()
        .map(|member| member.roles.iter().map(|role| role.get()).collect())
        .unwrap_or_default();
    let amount = boosted_amount(&config, base, user_id, &member_roles);

    state.xp_cache.record(guild_id, user_id, amount);
    debug!(guild_id, user_id, amount, "recorded xp");
}

/// Applies the highest applicable XP multiplier for the author: their own
/// user entry or any of their roles. No entry means 1.0.
fn boosted_amount(config: &LevelingConfig, base: u32, user_id: u64, roles: &[u64]) -> i64 {
    let mut multiplier: f64 = 1.0;

    if let Some(boost) = config.xp_boosts.get(&user_id) {
        multiplier = multiplier.max(*boost);
    }
    for role in roles {
        if let Some(boost) = config.xp_boosts.get(role) {
            multiplier = multiplier.max(*boost);
        }
    }

    (f64::from(base) * multiplier).round() as i64
}
