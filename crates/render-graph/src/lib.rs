//! VideoBones Render Graph
//!
//! Compiles a timeline description into a single ffmpeg invocation:
//!
//! ```text
//! video tracks ── Source Registry ── Layout Engine ── Video Assembler ──┐
//!                                                                      ├── Linearizer ── args
//! audio tracks ── Audio Chain Builder ────────────── Audio Mix ────────┘
//! ```
//!
//! The graph is built as tagged nodes joined by pad labels and only turned
//! into filter text at the very end, so every stage can be inspected and
//! tested on its own.

pub mod audio_chain;
pub mod audio_mix;
pub mod compile;
pub mod graph;
pub mod layout;
pub mod linearize;
pub mod sources;
pub mod video_graph;

pub use compile::{compile, compile_for_encode, compile_for_thumbnails};
pub use graph::{FilterGraph, FilterGraphNode, PadLabel, Stage};
pub use layout::{fit_and_crop, template_for, Fit, LayoutKind, Region};
pub use linearize::{CompiledCommand, EntryPoint};
pub use sources::{SourceId, SourceRegistry};
