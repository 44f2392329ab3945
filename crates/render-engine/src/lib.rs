//! VideoBones Render Engine
//!
//! Runs compiled render commands against ffmpeg:
//!
//! ```text
//! RenderRequest ── compile ── args ──┐
//!                                    ├── encode slot ───── preview / render
//!                                    └── thumbnails slot ─ <scratch>/thumbs/*.png
//!                                           │
//!                          stdout -progress ┴─▶ RenderProgress callbacks
//! ```
//!
//! Each slot holds at most one process; starting a new one kills the old
//! one first.

pub mod engine;
pub mod progress;
pub mod supervisor;

pub use engine::*;
pub use progress::*;
pub use supervisor::*;
