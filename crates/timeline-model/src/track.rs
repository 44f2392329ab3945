//! Video and audio track definitions.

use serde::{Deserialize, Serialize};

use crate::geometry::{Interval, Resolution};

/// A segment of the timeline laid out in a template.
///
/// `files[i]` is shown in region `i` of the layout, scaled from
/// `resolutions[i]`. An empty file path marks a blank region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Source clip per region, in region order.
    pub files: Vec<String>,

    /// Layout template name (e.g. `"quad"` or the editor glyph `"...."`).
    #[serde(alias = "screen_style")]
    pub layout: String,

    /// When the track is visible on the timeline.
    pub interval: Interval,

    /// Native resolution per file.
    pub resolutions: Vec<Resolution>,
}

impl VideoTrack {
    pub fn new(
        layout: impl Into<String>,
        files: Vec<String>,
        resolutions: Vec<Resolution>,
        interval: Interval,
    ) -> Self {
        Self {
            files,
            layout: layout.into(),
            interval,
            resolutions,
        }
    }

    /// A full-canvas track showing one clip.
    pub fn single(file: impl Into<String>, resolution: Resolution, interval: Interval) -> Self {
        Self::new("single", vec![file.into()], vec![resolution], interval)
    }
}

/// An audio clip with its effect toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Source file.
    pub file: String,

    /// Timeline offset in seconds at which the clip starts playing.
    #[serde(default)]
    pub start_time: f64,

    /// Linear gain, must be non-negative.
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Impulsive noise (click) removal.
    #[serde(default)]
    pub declick: bool,

    /// Clipped-sample restoration.
    #[serde(default)]
    pub declip: bool,

    #[serde(default)]
    pub echo: EchoSettings,

    #[serde(default)]
    pub reverb: ReverbSettings,
}

fn default_volume() -> f64 {
    1.0
}

impl AudioTrack {
    /// A track with every effect disabled at unity gain.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            start_time: 0.0,
            volume: 1.0,
            declick: false,
            declip: false,
            echo: EchoSettings::default(),
            reverb: ReverbSettings::default(),
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }
}

/// Single-tap echo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoSettings {
    pub enabled: bool,
    /// Delay in milliseconds.
    pub delay_ms: f64,
    /// Decay ratio of the reflected signal, in `(0, 1]`.
    pub decay: f64,
    pub in_gain: f64,
    pub out_gain: f64,
}

impl Default for EchoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: 1000.0,
            decay: 0.5,
            in_gain: 0.6,
            out_gain: 0.3,
        }
    }
}

/// Multi-tap reverb derived from one delay and one decay knob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbSettings {
    pub enabled: bool,
    /// Spacing between taps in milliseconds.
    pub delay_ms: f64,
    /// Decay base in `(0, 1]`; tap `i` decays by `decay^(1 + 0.6 i)`.
    pub decay: f64,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: 100.0,
            decay: 0.5,
        }
    }
}

/// Colour and blur adjustments applied to every tile showing `file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEffects {
    pub file: String,
    #[serde(default)]
    pub brightness: Option<f64>,
    #[serde(default)]
    pub contrast: Option<f64>,
    #[serde(default)]
    pub balance: Option<ColorBalance>,
    #[serde(default)]
    pub blur_radius: Option<f64>,
}

/// Per-channel gamma balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorBalance {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl VideoEffects {
    pub const BRIGHTNESS_RANGE: (f64, f64) = (-1.0, 1.0);
    pub const CONTRAST_RANGE: (f64, f64) = (-1000.0, 1000.0);
    pub const BALANCE_RANGE: (f64, f64) = (0.1, 10.0);
    pub const BLUR_RANGE: (f64, f64) = (1.0, 50.0);

    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            brightness: None,
            contrast: None,
            balance: None,
            blur_radius: None,
        }
    }

    /// Copy with every value clamped into the range the processor accepts.
    /// Non-finite values are dropped.
    pub fn clamped(&self) -> Self {
        fn clamp(value: Option<f64>, (lo, hi): (f64, f64)) -> Option<f64> {
            value.filter(|v| v.is_finite()).map(|v| v.clamp(lo, hi))
        }

        let balance = self.balance.and_then(|b| {
            Some(ColorBalance {
                r: clamp(Some(b.r), Self::BALANCE_RANGE)?,
                g: clamp(Some(b.g), Self::BALANCE_RANGE)?,
                b: clamp(Some(b.b), Self::BALANCE_RANGE)?,
            })
        });

        Self {
            file: self.file.clone(),
            brightness: clamp(self.brightness, Self::BRIGHTNESS_RANGE),
            contrast: clamp(self.contrast, Self::CONTRAST_RANGE),
            balance,
            blur_radius: clamp(self.blur_radius, Self::BLUR_RANGE),
        }
    }

    /// Whether any adjustment is set.
    pub fn is_identity(&self) -> bool {
        self.brightness.is_none()
            && self.contrast.is_none()
            && self.balance.is_none()
            && self.blur_radius.is_none()
    }
}
