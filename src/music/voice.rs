//! Songbird-backed audio sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use serenity::all::{ChannelId, GuildId};
use songbird::error::JoinError;
use songbird::events::{Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent};
use songbird::input::YoutubeDl;
use songbird::tracks::TrackHandle;
use songbird::Songbird;
use tokio::sync::mpsc::UnboundedSender;

use crate::music::player::{AudioSink, PlayerEvent};
use crate::music::track::Track;
use crate::music::MusicError;

/// [`AudioSink`] streaming through songbird, with yt-dlp as the source
/// backend.
pub struct SongbirdSink {
    manager: Arc<Songbird>,
    http_client: reqwest::Client,
    events: UnboundedSender<PlayerEvent>,
    /// Live track handle per guild, for volume changes and forced stops.
    handles: StdMutex<HashMap<u64, TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(
        manager: Arc<Songbird>,
        http_client: reqwest::Client,
        events: UnboundedSender<PlayerEvent>,
    ) -> Self {
        Self {
            manager,
            http_client,
            events,
            handles: StdMutex::new(HashMap::new()),
        }
    }

    fn take_handle(&self, guild_id: u64) -> Option<TrackHandle> {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&guild_id)
    }

    fn store_handle(&self, guild_id: u64, handle: TrackHandle) {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(guild_id, handle);
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn connect(&self, guild_id: u64, channel_id: u64) -> Result<(), MusicError> {
        self.manager
            .join(GuildId::new(guild_id), ChannelId::new(channel_id))
            .await?;
        Ok(())
    }

    async fn play(
        &self,
        guild_id: u64,
        track: &Track,
        volume: f32,
        seq: u64,
    ) -> Result<(), MusicError> {
        let call = self
            .manager
            .get(GuildId::new(guild_id))
            .ok_or(MusicError::NotConnected)?;
        let mut call = call.lock().await;

        let source = YoutubeDl::new(self.http_client.clone(), track.url.clone());
        let handle = call.play_input(source.into());
        handle.set_volume(volume)?;

        // Songbird invokes these from its own event task, never inline from
        // play_input, so sending back into the engine cannot re-enter a held
        // guild lock.
        handle.add_event(
            Event::Track(TrackEvent::End),
            TrackNotifier {
                event: PlayerEvent::TrackEnded { guild_id, seq },
                events: self.events.clone(),
            },
        )?;
        handle.add_event(
            Event::Track(TrackEvent::Error),
            TrackNotifier {
                event: PlayerEvent::TrackErrored { guild_id, seq },
                events: self.events.clone(),
            },
        )?;

        self.store_handle(guild_id, handle);
        Ok(())
    }

    async fn stop(&self, guild_id: u64) -> Result<(), MusicError> {
        if let Some(handle) = self.take_handle(guild_id) {
            handle.stop()?;
        }
        Ok(())
    }

    async fn set_volume(&self, guild_id: u64, volume: f32) -> Result<(), MusicError> {
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = handles.get(&guild_id).ok_or(MusicError::NothingPlaying)?;
        handle.set_volume(volume)?;
        Ok(())
    }

    async fn disconnect(&self, guild_id: u64) -> Result<(), MusicError> {
        self.take_handle(guild_id);
        match self.manager.remove(GuildId::new(guild_id)).await {
            Ok(()) | Err(JoinError::NoCall) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Forwards one track lifecycle event into the engine's event channel.
struct TrackNotifier {
    event: PlayerEvent,
    events: UnboundedSender<PlayerEvent>,
}

#[async_trait]
impl VoiceEventHandler for TrackNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        // The receiver is gone only during shutdown.
        let _ = self.events.send(self.event);
        None
    }
}
