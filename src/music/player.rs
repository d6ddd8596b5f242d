//! Guild playback engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::music::queue::{GuildPlayerState, PlayerStatus};
use crate::music::resolver::TrackResolver;
use crate::music::track::Track;
use crate::music::{MusicError, MAX_VOLUME};

/// Completion signal from the audio sink.
///
/// Events carry the play sequence number they were registered under so the
/// engine can discard signals from a track that has already been superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    TrackEnded { guild_id: u64, seq: u64 },
    TrackErrored { guild_id: u64, seq: u64 },
}

/// Audio backend the engine drives.
///
/// Implementations must emit [`PlayerEvent`]s when a started track finishes
/// or fails, carrying back the `seq` passed to `play`. Events must be
/// delivered as separate units of work, never inline from within these calls.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn connect(&self, guild_id: u64, channel_id: u64) -> Result<(), MusicError>;
    async fn play(
        &self,
        guild_id: u64,
        track: &Track,
        volume: f32,
        seq: u64,
    ) -> Result<(), MusicError>;
    async fn stop(&self, guild_id: u64) -> Result<(), MusicError>;
    async fn set_volume(&self, guild_id: u64, volume: f32) -> Result<(), MusicError>;
    async fn disconnect(&self, guild_id: u64) -> Result<(), MusicError>;
}

/// Request to announce a newly started track in a text channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlayingNotice {
    pub channel_id: u64,
    pub track: Track,
}

/// Read-only view of a guild's playback state for queue displays.
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    pub current: Option<Track>,
    pub upcoming: Vec<Track>,
    pub looping: bool,
    pub volume: f32,
}

struct PlayerInner {
    sink: Arc<dyn AudioSink>,
    resolver: Arc<dyn TrackResolver>,
    states: StdMutex<HashMap<u64, Arc<Mutex<GuildPlayerState>>>>,
    notices: Option<UnboundedSender<NowPlayingNotice>>,
    idle_timeout: Duration,
    default_volume: f32,
}

/// Playback engine coordinating every guild's queue and voice session.
///
/// All queue mutation and advancement for a guild happens under that guild's
/// lock, so concurrent completion events, skips, and enqueues serialize into
/// a single consistent sequence of transitions.
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

impl Player {
    pub fn new(
        sink: Arc<dyn AudioSink>,
        resolver: Arc<dyn TrackResolver>,
        default_volume: f32,
        idle_timeout: Duration,
        notices: Option<UnboundedSender<NowPlayingNotice>>,
    ) -> Self {
        Self {
            inner: Arc::new(PlayerInner {
                sink,
                resolver,
                states: StdMutex::new(HashMap::new()),
                notices,
                idle_timeout,
                default_volume,
            }),
        }
    }

    /// Spawns the task that feeds sink completion events back into the
    /// engine. Events are handled one at a time, as their own unit of work.
    pub fn spawn_event_loop(&self, mut events: UnboundedReceiver<PlayerEvent>) {
        let player = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                player.handle_event(event).await;
            }
        });
    }

    /// Resolves `query` and appends the resulting tracks to the guild's
    /// queue, joining `voice_channel_id` and starting playback if nothing is
    /// playing yet.
    ///
    /// Resolution happens before the guild lock is taken so a slow resolver
    /// does not stall skips or completion handling.
    pub async fn play(
        &self,
        guild_id: u64,
        voice_channel_id: u64,
        text_channel_id: u64,
        query: &str,
        requested_by: u64,
    ) -> Result<Vec<Track>, MusicError> {
        let tracks = self.inner.resolver.resolve(query, requested_by).await?;

        let handle = self.state(guild_id);
        let mut state = handle.lock().await;

        state.text_channel = Some(text_channel_id);

        if state.status == PlayerStatus::Idle {
            state.status = PlayerStatus::Connecting;
            if let Err(err) = self.inner.sink.connect(guild_id, voice_channel_id).await {
                state.status = PlayerStatus::Idle;
                return Err(err);
            }
        }

        state.queue.extend(tracks.iter().cloned());

        if state.status != PlayerStatus::Playing {
            self.play_next_locked(guild_id, &mut state).await;
        }

        Ok(tracks)
    }

    /// Stops the current track. Advancement happens through the sink's
    /// completion event, the same path as natural completion, so a skip
    /// racing a track ending cannot advance the queue twice.
    pub async fn skip(&self, guild_id: u64) -> Result<Track, MusicError> {
        let handle = self
            .existing_state(guild_id)
            .ok_or(MusicError::NothingPlaying)?;
        let mut state = handle.lock().await;

        if state.status != PlayerStatus::Playing {
            return Err(MusicError::NothingPlaying);
        }
        // Cleared so the completion event advances even when looping.
        let skipped = state.current.take().ok_or(MusicError::NothingPlaying)?;

        self.inner.sink.stop(guild_id).await?;

        Ok(skipped)
    }

    /// Tears down the guild's session: clears the queue, stops streaming,
    /// and disconnects.
    pub async fn stop(&self, guild_id: u64) -> Result<(), MusicError> {
        let Some(handle) = self.remove_state(guild_id) else {
            return Ok(());
        };
        let mut state = handle.lock().await;

        let was_connected = state.status != PlayerStatus::Idle;
        state.queue.clear();
        state.current = None;
        state.looping = false;
        // Invalidate in-flight completion events and idle timers.
        state.play_seq += 1;
        state.idle_epoch += 1;
        state.status = PlayerStatus::Idle;
        drop(state);

        if was_connected {
            self.inner.sink.stop(guild_id).await?;
            self.inner.sink.disconnect(guild_id).await?;
        }

        Ok(())
    }

    /// Sets the guild's playback volume, applying it to the live stream
    /// without interrupting playback.
    pub async fn set_volume(&self, guild_id: u64, volume: f32) -> Result<(), MusicError> {
        if !(0.0..=MAX_VOLUME).contains(&volume) {
            return Err(MusicError::VolumeOutOfRange);
        }

        let handle = self.state(guild_id);
        let mut state = handle.lock().await;

        state.volume = volume;
        if state.status == PlayerStatus::Playing {
            self.inner.sink.set_volume(guild_id, volume).await?;
        }

        Ok(())
    }

    /// Toggles replaying the current track and returns the new setting.
    pub async fn toggle_loop(&self, guild_id: u64) -> bool {
        let handle = self.state(guild_id);
        let mut state = handle.lock().await;

        state.looping = !state.looping;
        state.looping
    }

    /// Drops every queued track, leaving the current one playing. Returns the
    /// number of tracks removed.
    pub async fn clear(&self, guild_id: u64) -> usize {
        let Some(handle) = self.existing_state(guild_id) else {
            return 0;
        };
        let mut state = handle.lock().await;

        let removed = state.queue.len();
        state.queue.clear();
        removed
    }

    pub async fn snapshot(&self, guild_id: u64) -> QueueSnapshot {
        let Some(handle) = self.existing_state(guild_id) else {
            return QueueSnapshot {
                volume: self.inner.default_volume,
                ..QueueSnapshot::default()
            };
        };
        let state = handle.lock().await;

        QueueSnapshot {
            current: state.current.clone(),
            upcoming: state.queue.iter().cloned().collect(),
            looping: state.looping,
            volume: state.volume,
        }
    }

    /// Applies a completion signal from the sink.
    ///
    /// Signals whose sequence number does not match the guild's latest play
    /// are stale (a duplicate, or from a track already superseded by a skip)
    /// and are discarded, so the queue can never advance twice for one track.
    pub async fn handle_event(&self, event: PlayerEvent) {
        let (guild_id, seq, errored) = match event {
            PlayerEvent::TrackEnded { guild_id, seq } => (guild_id, seq, false),
            PlayerEvent::TrackErrored { guild_id, seq } => (guild_id, seq, true),
        };

        let Some(handle) = self.existing_state(guild_id) else {
            return;
        };
        let mut state = handle.lock().await;

        if seq != state.play_seq || state.status != PlayerStatus::Playing {
            debug!(guild_id, seq, "discarding stale playback event");
            return;
        }

        if errored {
            warn!(guild_id, seq, "track errored mid-stream, advancing");
            // Never replay a track that just failed, even when looping.
            state.current = None;
        } else if !state.looping {
            state.current = None;
        }

        self.play_next_locked(guild_id, &mut state).await;
    }

    /// Starts the next track, or enters Draining and arms the idle timer when
    /// there is none. Tracks that fail to start are logged and skipped.
    async fn play_next_locked(&self, guild_id: u64, state: &mut GuildPlayerState) {
        loop {
            let Some(track) = state.next_track() else {
                state.current = None;
                state.status = PlayerStatus::Draining;
                state.idle_epoch += 1;
                self.schedule_idle_disconnect(guild_id, state.idle_epoch);
                return;
            };

            state.play_seq += 1;
            // A fresh play cancels any pending idle disconnect.
            state.idle_epoch += 1;

            match self
                .inner
                .sink
                .play(guild_id, &track, state.volume, state.play_seq)
                .await
            {
                Ok(()) => {
                    info!(guild_id, track = %track.title, "now playing");
                    state.status = PlayerStatus::Playing;
                    if let (Some(notices), Some(channel_id)) =
                        (&self.inner.notices, state.text_channel)
                    {
                        let _ = notices.send(NowPlayingNotice {
                            channel_id,
                            track: track.clone(),
                        });
                    }
                    state.current = Some(track);
                    return;
                }
                Err(err) => {
                    warn!(guild_id, track = %track.title, "failed to start track, skipping: {err}");
                    state.current = None;
                }
            }
        }
    }

    fn schedule_idle_disconnect(&self, guild_id: u64, epoch: u64) {
        let player = self.clone();
        let timeout = self.inner.idle_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            player.idle_disconnect(guild_id, epoch).await;
        });
    }

    async fn idle_disconnect(&self, guild_id: u64, epoch: u64) {
        let Some(handle) = self.existing_state(guild_id) else {
            return;
        };

        {
            let mut state = handle.lock().await;
            if state.idle_epoch != epoch || state.status != PlayerStatus::Draining {
                return;
            }
            state.status = PlayerStatus::Idle;
        }

        self.remove_state(guild_id);

        info!(guild_id, "disconnecting after idle timeout");
        if let Err(err) = self.inner.sink.disconnect(guild_id).await {
            warn!(guild_id, "failed to disconnect idle session: {err}");
        }
    }

    fn state(&self, guild_id: u64) -> Arc<Mutex<GuildPlayerState>> {
        let mut states = self.lock_states();
        states
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(GuildPlayerState::new(self.inner.default_volume))))
            .clone()
    }

    fn existing_state(&self, guild_id: u64) -> Option<Arc<Mutex<GuildPlayerState>>> {
        self.lock_states().get(&guild_id).cloned()
    }

    fn remove_state(&self, guild_id: u64) -> Option<Arc<Mutex<GuildPlayerState>>> {
        self.lock_states().remove(&guild_id)
    }

    fn lock_states(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<u64, Arc<Mutex<GuildPlayerState>>>> {
        self.inner
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
