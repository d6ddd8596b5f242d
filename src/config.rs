//! Application configuration.
//!
//! Two layers of configuration exist:
//!
//! - [`Config`] holds process-level settings read once from the environment
//!   (database URL, bot token, playback defaults).
//! - [`LevelingConfig`] holds the leveling system's runtime-mutable settings,
//!   persisted as a JSON file and served to consumers through a [`ConfigStore`]
//!   that swaps the current snapshot atomically on every mutation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Process-level configuration loaded from environment variables.
pub struct Config {
    pub database_url: String,
    pub discord_bot_token: String,

    /// Prefix for text commands, defaults to `!`.
    pub command_prefix: String,

    /// Path of the persisted leveling configuration file.
    pub leveling_config_path: PathBuf,

    /// Initial playback volume for new guild sessions, 0.0–1.5.
    pub default_volume: f32,

    /// Seconds to linger in an empty voice channel before disconnecting.
    pub idle_disconnect_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: require_var("DATABASE_URL")?,
            discord_bot_token: require_var("DISCORD_BOT_TOKEN")?,
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string()),
            leveling_config_path: std::env::var("LEVELING_CONFIG_PATH")
                .unwrap_or_else(|_| "leveling_config.json".to_string())
                .into(),
            default_volume: parse_var("DEFAULT_VOLUME_PERCENT", 50u32)? as f32 / 100.0,
            idle_disconnect_secs: parse_var("IDLE_DISCONNECT_SECS", 60u64)?,
        })
    }
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidEnvVar {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

/// Inclusive range of XP awarded per eligible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpRange {
    pub min: u32,
    pub max: u32,
}

impl Default for XpRange {
    fn default() -> Self {
        Self { min: 5, max: 10 }
    }
}

/// Runtime-mutable leveling settings, persisted as JSON.
///
/// Every field carries a default so a partially written or older config file
/// still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelingConfig {
    pub xp_range: XpRange,
    pub xp_cooldown_seconds: u64,

    /// When false (the default), the XP cooldown is shared across guilds for
    /// each user. This mirrors the historical behavior; set true to scope the
    /// cooldown per guild.
    pub cooldown_per_guild: bool,

    /// Level threshold to reward role ID.
    pub level_roles: BTreeMap<i32, u64>,

    /// Channels in which no XP is awarded.
    pub blacklisted_channels: HashSet<u64>,

    /// XP multipliers keyed by user ID or role ID. The highest applicable
    /// multiplier wins; absent entries mean 1.0.
    pub xp_boosts: HashMap<u64, f64>,

    /// Channel for level-up announcements. Falls back to the guild's system
    /// channel when unset.
    pub congratulations_channel_id: Option<u64>,

    /// Keep all earned reward roles (true) or only the highest (false).
    pub stack_roles: bool,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            xp_range: XpRange::default(),
            xp_cooldown_seconds: 60,
            cooldown_per_guild: false,
            level_roles: BTreeMap::new(),
            blacklisted_channels: HashSet::new(),
            xp_boosts: HashMap::new(),
            congratulations_channel_id: None,
            stack_roles: false,
        }
    }
}

/// Shared handle to the current [`LevelingConfig`] snapshot.
///
/// Consumers call [`ConfigStore::current`] and read one immutable snapshot;
/// mutations go through [`ConfigStore::update`], which persists the new config
/// to disk and then swaps the shared reference in one assignment.
#[derive(Clone)]
pub struct ConfigStore {
    path: PathBuf,
    current: Arc<RwLock<Arc<LevelingConfig>>>,
}

impl ConfigStore {
    /// Loads the config from `path`, writing a default file if none exists.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            let config = LevelingConfig::default();
            write_config(&path, &config)?;
            config
        };

        Ok(Self {
            path,
            current: Arc::new(RwLock::new(Arc::new(config))),
        })
    }

    /// Returns the current config snapshot.
    pub fn current(&self) -> Arc<LevelingConfig> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `mutate` to a copy of the current config, persists it, and
    /// publishes it as the new snapshot.
    ///
    /// The snapshot is only swapped after the file write succeeds, so the
    /// in-memory config never runs ahead of the persisted one.
    pub fn update(
        &self,
        mutate: impl FnOnce(&mut LevelingConfig),
    ) -> Result<Arc<LevelingConfig>, ConfigError> {
        let mut next = (*self.current()).clone();
        mutate(&mut next);
        let next = Arc::new(next);

        write_config(&self.path, &next)?;

        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next.clone();

        Ok(next)
    }
}

fn write_config(path: &Path, config: &LevelingConfig) -> Result<(), ConfigError> {
    std::fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "cadence-test-{}-{}.json",
            tag,
            std::process::id()
        ))
    }

    #[test]
    fn creates_default_config_file_when_missing() {
        let path = temp_config_path("defaults");
        let _ = std::fs::remove_file(&path);

        let store = ConfigStore::load(&path).unwrap();
        let config = store.current();

        assert_eq!(config.xp_range, XpRange { min: 5, max: 10 });
        assert_eq!(config.xp_cooldown_seconds, 60);
        assert!(!config.stack_roles);
        assert!(path.exists());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn update_persists_and_publishes_new_snapshot() {
        let path = temp_config_path("update");
        let _ = std::fs::remove_file(&path);

        let store = ConfigStore::load(&path).unwrap();
        let before = store.current();

        store
            .update(|c| {
                c.stack_roles = true;
                c.level_roles.insert(5, 1111);
            })
            .unwrap();

        // Old snapshot is unchanged, new snapshot sees the mutation.
        assert!(!before.stack_roles);
        assert!(store.current().stack_roles);

        // A fresh store reading the same file sees the persisted state.
        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.current().level_roles.get(&5), Some(&1111));

        let _ = std::fs::remove_file(&path);
    }
}
