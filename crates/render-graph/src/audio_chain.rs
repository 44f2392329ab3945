//! Per-track audio effect chains.
//!
//! Stage order is fixed: declick, declip, echo or reverb, then volume/format
//! normalization, then the start-offset delay.

use bones_common::error::{CompileError, TrackRef};
use bones_timeline_model::track::AudioTrack;

/// Longest delay the processor's echo stage accepts, in milliseconds.
pub const MAX_ECHO_DELAY_MS: f64 = 90_000.0;

/// Number of taps a reverb expands into.
pub const REVERB_TAPS: usize = 10;

/// Exponent step between successive reverb tap decays.
const REVERB_DECAY_EXPONENT_STEP: f64 = 0.6;

const REVERB_IN_GAIN: f64 = 0.8;
const REVERB_OUT_GAIN: f64 = 0.9;

/// One reflection of a multi-tap echo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoTap {
    pub delay_ms: f64,
    pub decay: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioStage {
    /// Impulsive noise removal.
    Declick,
    /// Clipped-sample restoration.
    Declip,
    /// Single-tap echo.
    Echo {
        in_gain: f64,
        out_gain: f64,
        tap: EchoTap,
    },
    /// Multi-tap echo bank.
    Reverb {
        in_gain: f64,
        out_gain: f64,
        taps: Vec<EchoTap>,
    },
    /// Convert to float planar stereo at `sample_rate`, then apply `volume`.
    Normalize { sample_rate: u32, volume: f64 },
    /// Shift the track later on the timeline.
    Delay { ms: u64 },
}

/// Ordered effect stages for one audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChain {
    pub track: usize,
    pub stages: Vec<AudioStage>,
}

impl AudioChain {
    pub fn has_echo(&self) -> bool {
        self.stages
            .iter()
            .any(|stage| matches!(stage, AudioStage::Echo { .. }))
    }

    pub fn has_reverb(&self) -> bool {
        self.stages
            .iter()
            .any(|stage| matches!(stage, AudioStage::Reverb { .. }))
    }
}

/// Expand a reverb knob pair into its tap bank.
///
/// Tap `i` sits at `min((i + 1) * delay, 90000)` ms and decays by
/// `decay_base^(1 + 0.6 i)`.
pub fn reverb_taps(delay_ms: f64, decay_base: f64) -> Vec<EchoTap> {
    (0..REVERB_TAPS)
        .map(|i| EchoTap {
            delay_ms: ((i + 1) as f64 * delay_ms).min(MAX_ECHO_DELAY_MS),
            decay: decay_base.powf(1.0 + REVERB_DECAY_EXPONENT_STEP * i as f64),
        })
        .collect()
}

/// Build the effect chain for audio track `index`.
///
/// Reverb suppresses echo: when both are enabled only the reverb stage is
/// emitted. Parameters are validated, never clamped.
pub fn build(track: &AudioTrack, index: usize, sample_rate: u32) -> Result<AudioChain, CompileError> {
    let track_ref = TrackRef::Audio(index);

    if !track.volume.is_finite() || track.volume < 0.0 {
        return Err(CompileError::invalid_parameter(
            track_ref,
            "volume",
            track.volume,
        ));
    }
    if !track.start_time.is_finite() || track.start_time < 0.0 {
        return Err(CompileError::invalid_parameter(
            track_ref,
            "start_time",
            track.start_time,
        ));
    }

    let mut stages = Vec::new();
    if track.declick {
        stages.push(AudioStage::Declick);
    }
    if track.declip {
        stages.push(AudioStage::Declip);
    }

    if track.reverb.enabled {
        check_delay(track_ref, "reverb.delay_ms", track.reverb.delay_ms)?;
        check_unit(track_ref, "reverb.decay", track.reverb.decay)?;
        if track.echo.enabled {
            tracing::debug!(track = index, "Reverb enabled, suppressing echo");
        }
        stages.push(AudioStage::Reverb {
            in_gain: REVERB_IN_GAIN,
            out_gain: REVERB_OUT_GAIN,
            taps: reverb_taps(track.reverb.delay_ms, track.reverb.decay),
        });
    } else if track.echo.enabled {
        let echo = &track.echo;
        check_delay(track_ref, "echo.delay_ms", echo.delay_ms)?;
        check_unit(track_ref, "echo.decay", echo.decay)?;
        check_unit(track_ref, "echo.in_gain", echo.in_gain)?;
        check_unit(track_ref, "echo.out_gain", echo.out_gain)?;
        stages.push(AudioStage::Echo {
            in_gain: echo.in_gain,
            out_gain: echo.out_gain,
            tap: EchoTap {
                delay_ms: echo.delay_ms,
                decay: echo.decay,
            },
        });
    }

    stages.push(AudioStage::Normalize {
        sample_rate,
        volume: track.volume,
    });

    let delay_ms = (track.start_time * 1000.0).round() as u64;
    if delay_ms > 0 {
        stages.push(AudioStage::Delay { ms: delay_ms });
    }

    Ok(AudioChain {
        track: index,
        stages,
    })
}

fn check_delay(track: TrackRef, parameter: &'static str, value: f64) -> Result<(), CompileError> {
    if value.is_finite() && value > 0.0 && value <= MAX_ECHO_DELAY_MS {
        Ok(())
    } else {
        Err(CompileError::invalid_parameter(track, parameter, value))
    }
}

fn check_unit(track: TrackRef, parameter: &'static str, value: f64) -> Result<(), CompileError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(CompileError::invalid_parameter(track, parameter, value))
    }
}
