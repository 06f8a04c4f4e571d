use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::playback::pool::MAX_SLOTS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Folder rescanned on startup if it still exists
    pub last_folder: Option<PathBuf>,
    pub video_count: usize,
    pub volume: u8,
    pub autoplay_on_load: bool,
    /// Replace a finished slot with a new random file instead of holding it
    pub auto_advance_on_end: bool,
    pub overlay_hide_secs: f64,
    pub volume_step: u8,
    pub seek_step_secs: f64,
    pub preview_width: u32,
    pub preview_height: u32,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_folder: None,
            video_count: 1,
            volume: 100,
            autoplay_on_load: true,
            auto_advance_on_end: false,
            overlay_hide_secs: 5.0,
            volume_step: 5,
            seek_step_secs: 10.0,
            preview_width: 480,
            preview_height: 270,
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl AppConfig {
    /// Config from the platform config dir. Any read or write failure
    /// falls back to defaults; a broken config never stops the app.
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&Self::config_path())
    }

    pub fn load_or_default_from(config_path: &Path) -> Self {
        match Self::load_from(config_path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{}, continuing with default settings", e);
                Self::default()
            }
        }
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file at {}: {}", config_path.display(), e))?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config.sanitized())
                }
                Err(e) => {
                    log::warn!("Config file exists but has issues ({}), creating new one with defaults", e);
                    let new_config = Self::default();
                    new_config.save_to(config_path)
                        .map_err(|save_err| anyhow::anyhow!("Failed to save new config: {}", save_err))?;
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config.save_to(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to save default config: {}", e))?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        log::debug!("Saved config to {}", config_path.display());
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shuffle-screen")
            .join("config.json")
    }

    /// Clamp hand-edited values back into their valid ranges
    pub fn sanitized(mut self) -> Self {
        self.video_count = self.video_count.clamp(1, MAX_SLOTS);
        self.volume = self.volume.min(100);
        self.volume_step = self.volume_step.clamp(1, 100);
        if !self.overlay_hide_secs.is_finite() || self.overlay_hide_secs <= 0.0 {
            self.overlay_hide_secs = Self::default().overlay_hide_secs;
        }
        if !self.seek_step_secs.is_finite() || self.seek_step_secs <= 0.0 {
            self.seek_step_secs = Self::default().seek_step_secs;
        }
        self.preview_width = self.preview_width.clamp(16, 3840) & !1;
        self.preview_height = self.preview_height.clamp(16, 2160) & !1;
        self
    }

    pub fn overlay_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.overlay_hide_secs)
    }
}
