use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use serenity::all::{ChannelId, Client, Colour, CreateEmbed, CreateMessage, GatewayIntents, Http};
use songbird::SerenityInit;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};

use crate::bot::handler::Handler;
use crate::config::{Config, ConfigStore};
use crate::error::AppError;
use crate::leveling::{CooldownTable, XpCache};
use crate::music::track::format_duration;
use crate::music::voice::SongbirdSink;
use crate::music::{NowPlayingNotice, Player, YtDlpResolver};

/// Shared state available to every event handler and command.
pub struct BotState {
    pub db: DatabaseConnection,
    pub leveling_config: ConfigStore,
    pub xp_cache: Arc<XpCache>,
    pub cooldowns: CooldownTable,
    pub player: Player,
    pub command_prefix: String,
    /// Set once the first ready event has started the flush scheduler, so
    /// gateway reconnects do not start a second one.
    pub scheduler_started: AtomicBool,
}

/// Builds the Discord client with the playback engine and shared bot state
/// wired up.
///
/// The songbird voice manager is registered on the client, and the engine's
/// completion-event and now-playing-announcement loops are spawned here so
/// they live for the whole process.
///
/// # Arguments
/// - `config` - Application configuration
/// - `db` - Database connection shared with the flush scheduler
/// - `leveling_config` - Runtime-mutable leveling settings store
/// - `xp_cache` - XP accumulator shared with the flush scheduler
///
/// # Returns
/// - `Ok(Client)` - Client ready to be started
/// - `Err(AppError)` - Client construction failed
pub async fn init_bot(
    config: &Config,
    db: DatabaseConnection,
    leveling_config: ConfigStore,
    xp_cache: Arc<XpCache>,
) -> Result<Client, AppError> {
    // MESSAGE_CONTENT and GUILD_MEMBERS are privileged intents and must be
    // enabled in the Discord developer portal.
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_VOICE_STATES;

    let manager = songbird::Songbird::serenity();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();

    let sink = Arc::new(SongbirdSink::new(
        manager.clone(),
        reqwest::Client::new(),
        event_tx,
    ));
    let player = Player::new(
        sink,
        Arc::new(YtDlpResolver::new()),
        config.default_volume,
        Duration::from_secs(config.idle_disconnect_secs),
        Some(notice_tx),
    );
    player.spawn_event_loop(event_rx);

    let state = Arc::new(BotState {
        db,
        leveling_config,
        xp_cache,
        cooldowns: CooldownTable::new(),
        player,
        command_prefix: config.command_prefix.clone(),
        scheduler_started: AtomicBool::new(false),
    });

    let client = Client::builder(&config.discord_bot_token, intents)
        .event_handler(Handler::new(state))
        .register_songbird_with(manager)
        .await?;

    spawn_now_playing_announcer(client.http.clone(), notice_rx);

    Ok(client)
}

/// Runs the Discord client until shutdown. Blocks, so call it last or from a
/// dedicated task.
pub async fn start_bot(mut client: Client) -> Result<(), AppError> {
    info!("Starting Discord bot");
    client.start().await?;
    Ok(())
}

/// Posts a "now playing" embed for every track the engine starts.
fn spawn_now_playing_announcer(http: Arc<Http>, mut notices: UnboundedReceiver<NowPlayingNotice>) {
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            let mut description = format!("[{}]({})", notice.track.title, notice.track.url);
            if let Some(duration) = notice.track.duration {
                description.push_str(&format!(" ({})", format_duration(duration)));
            }

            let mut embed = CreateEmbed::new()
                .title("Now playing")
                .description(description)
                .colour(Colour::BLURPLE);
            if let Some(thumbnail) = &notice.track.thumbnail {
                embed = embed.thumbnail(thumbnail);
            }

            if let Err(e) = ChannelId::new(notice.channel_id)
                .send_message(&http, CreateMessage::new().embed(embed))
                .await
            {
                warn!(channel_id = notice.channel_id, "Failed to announce track: {e}");
            }
        }
    });
}
