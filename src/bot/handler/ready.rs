//! Ready event handler for bot initialization.
//!
//! Fired when the bot completes the gateway handshake. Besides logging the
//! connection, this is where the XP flush scheduler is started: the scheduler
//! needs a gateway context for role synchronization and level-up
//! announcements, and the ready event is the first place one is available.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serenity::all::{ActivityData, Context, Ready};
use tracing::{error, info};

use crate::bot::start::BotState;
use crate::scheduler::xp_flush;

/// Handles the ready event when the bot connects to Discord.
///
/// The scheduler is started exactly once; reconnects fire this event again
/// but must not stack additional flush jobs.
///
/// # Arguments
/// - `state` - Shared bot state
/// - `ctx` - Discord context, cloned into the scheduler
/// - `ready` - Ready event data containing bot user information
pub async fn handle_ready(state: &Arc<BotState>, ctx: Context, ready: Ready) {
    info!("{} is connected to Discord", ready.user.name);

    ctx.set_activity(Some(ActivityData::listening("your messages")));

    if state.scheduler_started.swap(true, Ordering::SeqCst) {
        return;
    }

    let scheduler_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = xp_flush::start_scheduler(ctx, scheduler_state).await {
            error!("XP flush scheduler error: {e}");
        }
    });
}
