//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the media processor binary.
pub const FFMPEG_BIN_ENV: &str = "FFMPEG_BIN";

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scratch directory the media processor runs in (preview segments,
    /// thumbnails, relative render outputs).
    pub scratch_dir: PathBuf,

    /// Media processor settings.
    pub ffmpeg: FfmpegConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Media processor settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// Explicit path to the ffmpeg binary. `None` means look it up on `PATH`.
    pub binary: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "bones_render_graph=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("videobones"),
            ffmpeg: FfmpegConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Directory thumbnail runs write their numbered images into.
    pub fn thumbnails_dir(&self) -> PathBuf {
        self.scratch_dir.join("thumbs")
    }
}

impl FfmpegConfig {
    /// Resolve the binary to launch: `FFMPEG_BIN`, then the configured
    /// override, then plain `ffmpeg` for a `PATH` lookup.
    pub fn resolve_binary(&self) -> PathBuf {
        std::env::var_os(FFMPEG_BIN_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.binary.clone())
            .unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("videobones").join("config.json")
}
