//! Pixel geometry and timeline intervals.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A frame size in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 1920x1080, the editor's default canvas.
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether this size is at least `other` on both axes.
    pub fn covers(&self, other: &Resolution) -> bool {
        self.width >= other.width && self.height >= other.height
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Top-left anchor of a region, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Position,
    pub size: Resolution,
}

impl Rect {
    pub const fn new(origin: Position, size: Resolution) -> Self {
        Self { origin, size }
    }

    pub fn right(&self) -> u32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> u32 {
        self.origin.y + self.size.height
    }

    /// Whether the two rectangles share any pixel.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.origin.x < other.right()
            && other.origin.x < self.right()
            && self.origin.y < other.bottom()
            && other.origin.y < self.bottom()
    }
}

/// A half-open time interval `[start, end)` in seconds.
///
/// Serialized as a two-element array, matching how the editor sends it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length in seconds (zero for inverted intervals).
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether `t` lies inside `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    /// Finite, non-negative start, and `start <= end`.
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.start <= self.end
    }
}

impl From<(f64, f64)> for Interval {
    fn from((start, end): (f64, f64)) -> Self {
        Self { start, end }
    }
}

impl From<Interval> for (f64, f64) {
    fn from(interval: Interval) -> Self {
        (interval.start, interval.end)
    }
}
