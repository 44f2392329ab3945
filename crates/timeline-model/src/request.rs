//! Render requests: the immutable input to one compile.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Resolution;
use crate::track::{AudioTrack, VideoEffects, VideoTrack};

/// What the media processor is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Numbered still images, one per second of timeline.
    Thumbnail,
    /// Low-latency DASH stream read at native rate.
    Preview,
    /// Final single-file encode.
    Render,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Thumbnail => "thumbnail",
            OutputMode::Preview => "preview",
            OutputMode::Render => "render",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an [`OutputMode`] or [`AspectRatio`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRequestFieldError {
    #[error("unknown output mode {0:?} (expected thumbnail, preview, or render)")]
    OutputMode(String),

    #[error("invalid aspect ratio {0:?} (expected A:B with non-zero integers)")]
    AspectRatio(String),
}

impl FromStr for OutputMode {
    type Err = ParseRequestFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thumbnail" | "thumbnails" => Ok(OutputMode::Thumbnail),
            "preview" => Ok(OutputMode::Preview),
            "render" => Ok(OutputMode::Render),
            _ => Err(ParseRequestFieldError::OutputMode(s.to_string())),
        }
    }
}

/// Display aspect ratio in `A:B` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    pub const WIDESCREEN: AspectRatio = AspectRatio { num: 16, den: 9 };
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::WIDESCREEN
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.num, self.den)
    }
}

impl FromStr for AspectRatio {
    type Err = ParseRequestFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRequestFieldError::AspectRatio(s.to_string());
        let (num, den) = s.split_once(':').ok_or_else(err)?;
        let num: u32 = num.trim().parse().map_err(|_| err())?;
        let den: u32 = den.trim().parse().map_err(|_| err())?;
        if num == 0 || den == 0 {
            return Err(err());
        }
        Ok(Self { num, den })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = ParseRequestFieldError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

/// Everything one compile needs, snapshotted from editor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub output_mode: OutputMode,

    /// Output canvas size.
    #[serde(default)]
    pub canvas: Resolution,

    #[serde(default = "default_fps")]
    pub frames_per_second: u32,

    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Target video bitrate, in the processor's notation (e.g. `"6M"`).
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Rate-control buffer size (e.g. `"32M"`).
    #[serde(default = "default_buffer_size")]
    pub buffer_size: String,

    #[serde(default = "default_sample_rate")]
    pub audio_sample_rate: u32,

    /// Render-mode output file; relative paths resolve against the scratch dir.
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    /// Preview-mode manifest file.
    #[serde(default = "default_preview_manifest")]
    pub preview_manifest: PathBuf,

    #[serde(default)]
    pub video_effects: Vec<VideoEffects>,

    #[serde(default)]
    pub video_tracks: Vec<VideoTrack>,

    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
}

fn default_fps() -> u32 {
    60
}

fn default_video_bitrate() -> String {
    "6M".to_string()
}

fn default_audio_bitrate() -> String {
    "320k".to_string()
}

fn default_buffer_size() -> String {
    "32M".to_string()
}

fn default_sample_rate() -> u32 {
    48_000
}

fn default_output_file() -> PathBuf {
    PathBuf::from("output.mp4")
}

fn default_preview_manifest() -> PathBuf {
    PathBuf::from("stream.mpd")
}

impl RenderRequest {
    /// An empty request with the editor's default settings.
    pub fn new(output_mode: OutputMode) -> Self {
        Self {
            output_mode,
            canvas: Resolution::FULL_HD,
            frames_per_second: default_fps(),
            aspect_ratio: AspectRatio::WIDESCREEN,
            video_bitrate: default_video_bitrate(),
            audio_bitrate: default_audio_bitrate(),
            buffer_size: default_buffer_size(),
            audio_sample_rate: default_sample_rate(),
            output_file: default_output_file(),
            preview_manifest: default_preview_manifest(),
            video_effects: Vec::new(),
            video_tracks: Vec::new(),
            audio_tracks: Vec::new(),
        }
    }

    /// Timeline length: the latest end of any video track interval.
    pub fn duration_secs(&self) -> f64 {
        self.video_tracks
            .iter()
            .map(|track| track.interval.end)
            .filter(|end| end.is_finite())
            .fold(0.0, f64::max)
    }

    /// Frame rate used for every rate-dependent argument; zero is raised to 1.
    pub fn effective_fps(&self) -> u32 {
        self.frames_per_second.max(1)
    }

    /// Parse a request from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
