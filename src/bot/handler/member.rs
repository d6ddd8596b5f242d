//! Member event handlers.

use std::sync::Arc;

use serenity::all::{Context, GuildId, Member, User};
use tracing::{error, info};

use crate::bot::start::BotState;
use crate::data::XpRepository;

/// Handles a member leaving a guild by removing their XP ledger row and any
/// pending cached delta, so the next flush does not resurrect the row.
pub async fn handle_guild_member_removal(
    state: &Arc<BotState>,
    _ctx: Context,
    guild_id: GuildId,
    user: User,
    _member_data_if_available: Option<Member>,
) {
    if user.bot {
        return;
    }

    state.xp_cache.remove(guild_id.get(), user.id.get());

    let repository = XpRepository::new(&state.db);
    match repository.delete(guild_id.get(), user.id.get()).await {
        Ok(()) => info!(
            guild_id = guild_id.get(),
            user_id = user.id.get(),
            "removed xp record for departed member"
        ),
        Err(e) => error!(
            guild_id = guild_id.get(),
            user_id = user.id.get(),
            "failed to remove xp record for departed member: {e}"
        ),
    }
}
