//! Parsing of the processor's `-progress` key/value stream.

use serde::Serialize;

/// Accumulated state from `key=value` progress lines.
///
/// The rendered position only ever moves forward; a late or malformed value
/// never rewinds it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProgressState {
    pub out_time_secs: f64,
    pub frame: u64,
    pub complete: bool,
}

impl ProgressState {
    /// Fold one line into the state. Returns `true` when the line closes a
    /// progress block and a report should be emitted.
    pub fn feed_line(&mut self, line: &str) -> bool {
        let Some((key, value)) = line.trim().split_once('=') else {
            return false;
        };
        self.update(key.trim(), value.trim());
        key.trim() == "progress"
    }

    pub fn update(&mut self, key: &str, value: &str) {
        match key {
            // Both keys carry microseconds; `out_time_ms` is misnamed upstream.
            "out_time_us" | "out_time_ms" => match value.parse::<f64>() {
                Ok(us) if us.is_finite() => {
                    self.out_time_secs = self.out_time_secs.max(us / 1_000_000.0);
                }
                Ok(_) => {}
                Err(_) if value == "N/A" => {}
                Err(_) => tracing::warn!(key, value, "Unparseable progress value"),
            },
            "frame" => {
                if let Ok(frame) = value.parse::<u64>() {
                    self.frame = self.frame.max(frame);
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    /// Snapshot for callbacks, relative to a timeline of `duration_secs`.
    pub fn report(&self, duration_secs: f64) -> RenderProgress {
        let fraction = if self.complete {
            1.0
        } else if duration_secs > 0.0 {
            (self.out_time_secs / duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };

        RenderProgress {
            rendered_secs: self.out_time_secs,
            frames: self.frame,
            fraction,
            complete: self.complete,
        }
    }
}

/// Progress report handed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderProgress {
    /// Seconds of output written so far; non-decreasing.
    pub rendered_secs: f64,
    pub frames: u64,
    /// `rendered_secs` over the timeline duration, in `[0, 1]`.
    pub fraction: f64,
    pub complete: bool,
}
