use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::manager::QueueOptions;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: f32,
    pub max_queue_size: usize,

    // Cola
    pub save_previous_songs: bool,
    pub leave_on_stop: bool,
    pub leave_on_finish: bool,

    // Límites
    pub max_song_duration: u64, // En segundos
    pub related_search_limit: usize,

    // Features
    pub enable_autoplay: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,

            // Cola
            save_previous_songs: std::env::var("SAVE_PREVIOUS_SONGS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            leave_on_stop: std::env::var("LEAVE_ON_STOP")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            leave_on_finish: std::env::var("LEAVE_ON_FINISH")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,

            // Límites
            max_song_duration: std::env::var("MAX_SONG_DURATION")
                .unwrap_or_else(|_| "3600".to_string()) // 1 hora
                .parse()?,
            related_search_limit: std::env::var("RELATED_SEARCH_LIMIT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,

            // Features
            enable_autoplay: std::env::var("ENABLE_AUTOPLAY")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 2.0
    /// - Queue size, song duration and related search limit must be > 0
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            );
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.max_song_duration == 0 {
            anyhow::bail!("Max song duration must be greater than 0");
        }

        if self.related_search_limit == 0 {
            anyhow::bail!("Related search limit must be greater than 0");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the Discord token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Audio: {}% vol\n  \
            Queue: history={}, leave_on_stop={}, leave_on_finish={}\n  \
            Limits: {} queue, {}s max duration, {} related results\n  \
            Features: Autoplay={}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0) as u32,
            self.save_previous_songs,
            self.leave_on_stop,
            self.leave_on_finish,
            self.max_queue_size,
            self.max_song_duration,
            self.related_search_limit,
            self.enable_autoplay
        )
    }

    /// Opciones aplicadas a cada cola nueva
    pub fn queue_options(&self) -> QueueOptions {
        QueueOptions {
            save_previous_songs: self.save_previous_songs,
            autoplay: self.enable_autoplay,
            leave_on_stop: self.leave_on_stop,
            leave_on_finish: self.leave_on_finish,
        }
    }

    pub fn max_song_duration(&self) -> Duration {
        Duration::from_secs(self.max_song_duration)
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            default_volume: 0.5,
            max_queue_size: 1000,

            save_previous_songs: true,
            leave_on_stop: true,
            leave_on_finish: false,

            max_song_duration: 3600,
            related_search_limit: 5,

            enable_autoplay: false,
        }
    }
}
