//! Subcommand implementations.

use std::io::Read;
use std::path::{Path, PathBuf};

use bones_common::config::AppConfig;
use bones_render_engine::RenderEngine;
use bones_timeline_model::request::{OutputMode, RenderRequest};

pub mod compile;
pub mod layout;
pub mod preview;
pub mod render;
pub mod thumbnails;

/// Engine for `config`. An explicit `--ffmpeg` binary wins over both
/// `FFMPEG_BIN` and the config file.
pub fn engine(config: AppConfig, ffmpeg: Option<PathBuf>) -> RenderEngine {
    match ffmpeg {
        Some(binary) => RenderEngine::with_binary(config, binary),
        None => RenderEngine::new(config),
    }
}

/// Read a request from `path` (or stdin for `-`). `mode` replaces the
/// request's output mode, and supplies it when the file has none.
pub fn load_request(path: &Path, mode: Option<OutputMode>) -> anyhow::Result<RenderRequest> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read request {}: {e}", path.display()))?
    };

    let mut value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Request is not valid JSON: {e}"))?;
    if let (Some(mode), Some(object)) = (mode, value.as_object_mut()) {
        object.insert("output_mode".to_string(), serde_json::to_value(mode)?);
    }

    serde_json::from_value(value).map_err(|e| anyhow::anyhow!("Invalid render request: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_flag_overrides_environment() {
        std::env::set_var(bones_common::config::FFMPEG_BIN_ENV, "/opt/env/ffmpeg");

        let flagged = engine(AppConfig::default(), Some(PathBuf::from("/opt/flag/ffmpeg")));
        assert_eq!(flagged.binary(), Path::new("/opt/flag/ffmpeg"));

        let unflagged = engine(AppConfig::default(), None);
        assert_eq!(unflagged.binary(), Path::new("/opt/env/ffmpeg"));

        std::env::remove_var(bones_common::config::FFMPEG_BIN_ENV);
    }

    #[test]
    fn test_mode_override_fills_missing_output_mode() {
        let dir = std::env::temp_dir().join(format!("videobones_cli_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("request.json");
        std::fs::write(&path, r#"{"canvas":{"width":640,"height":360}}"#).unwrap();

        let request = load_request(&path, Some(OutputMode::Thumbnail)).unwrap();
        assert_eq!(request.output_mode, OutputMode::Thumbnail);
        assert_eq!(request.canvas.width, 640);
        assert!(load_request(&path, None).is_err());
    }
}
