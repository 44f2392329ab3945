//! Layout templates and aspect-preserving fit.
//!
//! A template partitions the output canvas into regions. Odd canvas sizes are
//! split so the right/bottom half takes the remainder pixel, which keeps the
//! regions an exact tiling of the canvas.

use std::fmt;
use std::str::FromStr;

use bones_common::error::CompileError;
use bones_timeline_model::geometry::{Position, Rect, Resolution};
use serde::{Deserialize, Serialize};

/// The closed set of screen layouts a video track can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    /// One region covering the canvas.
    Single,
    /// Four equal quadrants.
    Quad,
    /// Full-height left half, right half split top/bottom.
    SidebarLeft,
    /// Full-width top half, bottom half split left/right.
    BannerTop,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 4] = [
        LayoutKind::Single,
        LayoutKind::Quad,
        LayoutKind::SidebarLeft,
        LayoutKind::BannerTop,
    ];

    /// Number of tiles a track with this layout must supply.
    pub fn region_count(self) -> usize {
        match self {
            LayoutKind::Single => 1,
            LayoutKind::Quad => 4,
            LayoutKind::SidebarLeft | LayoutKind::BannerTop => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::Single => "single",
            LayoutKind::Quad => "quad",
            LayoutKind::SidebarLeft => "sidebar-left",
            LayoutKind::BannerTop => "banner-top",
        }
    }

    /// The editor's screen-style glyph for this layout.
    pub fn glyph(self) -> &'static str {
        match self {
            LayoutKind::Single => ".",
            LayoutKind::Quad => "....",
            LayoutKind::SidebarLeft => "|..",
            LayoutKind::BannerTop => "_..",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutKind {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayoutKind::ALL
            .into_iter()
            .find(|kind| s == kind.name() || s == kind.glyph())
            .ok_or_else(|| CompileError::InvalidLayoutKind {
                name: s.to_string(),
            })
    }
}

/// One template region: where it sits on the canvas and how large it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub anchor: Position,
    pub size: Resolution,
}

impl Region {
    fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            anchor: Position::new(x, y),
            size: Resolution::new(width, height),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.anchor, self.size)
    }

    /// Whether the region is the whole canvas.
    pub fn covers_canvas(&self, canvas: Resolution) -> bool {
        self.anchor == Position::ORIGIN && self.size == canvas
    }
}

/// Regions of `kind` on a canvas of `canvas`, in tile order.
pub fn template_for(kind: LayoutKind, canvas: Resolution) -> Vec<Region> {
    let (w, h) = (canvas.width, canvas.height);
    let (left_w, top_h) = (w / 2, h / 2);
    let (right_w, bottom_h) = (w - left_w, h - top_h);

    match kind {
        LayoutKind::Single => vec![Region::new(0, 0, w, h)],
        LayoutKind::Quad => vec![
            Region::new(0, 0, left_w, top_h),
            Region::new(left_w, 0, right_w, top_h),
            Region::new(0, top_h, left_w, bottom_h),
            Region::new(left_w, top_h, right_w, bottom_h),
        ],
        LayoutKind::SidebarLeft => vec![
            Region::new(0, 0, left_w, h),
            Region::new(left_w, 0, right_w, top_h),
            Region::new(left_w, top_h, right_w, bottom_h),
        ],
        LayoutKind::BannerTop => vec![
            Region::new(0, 0, w, top_h),
            Region::new(0, top_h, left_w, bottom_h),
            Region::new(left_w, top_h, right_w, bottom_h),
        ],
    }
}

/// Result of fitting a source into a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fit {
    /// `min(native.w / region.w, native.h / region.h)`; the source is divided
    /// by this ratio.
    pub ratio: f64,
    /// Scaled source size; covers the region on both axes.
    pub fitted: Resolution,
    /// Centered crop window inside `fitted`, exactly the region size.
    pub crop: Rect,
}

/// Scale `native` to cover `region` while preserving aspect ratio, then
/// center-crop the overflow.
///
/// The covering axis is chosen by exact integer cross-multiplication so
/// rounding the other axis down can never drop it below the region. Returns
/// `None` for an empty native or region size, or when the fitted size does
/// not fit in `u32`.
pub fn fit_and_crop(native: Resolution, region: Resolution) -> Option<Fit> {
    if native.is_empty() || region.is_empty() {
        return None;
    }

    let nw = u64::from(native.width);
    let nh = u64::from(native.height);
    let rw = u64::from(region.width);
    let rh = u64::from(region.height);

    let ratio = (nw as f64 / rw as f64).min(nh as f64 / rh as f64);

    // nw/nh >= rw/rh: the source is relatively wider, so height binds.
    let (fw, fh) = if nw * rh >= nh * rw {
        (nw * rh / nh, rh)
    } else {
        (rw, nh * rw / nw)
    };

    let fitted = Resolution::new(u32::try_from(fw).ok()?, u32::try_from(fh).ok()?);
    let offset = Position::new(
        (fitted.width - region.width) / 2,
        (fitted.height - region.height) / 2,
    );

    Some(Fit {
        ratio,
        fitted,
        crop: Rect::new(offset, region),
    })
}
