//! VideoBones Timeline Model
//!
//! Defines the data contracts the editor hands to the render-graph compiler:
//! - **Geometry:** Pixel resolutions, anchor positions, and timeline intervals
//! - **Tracks:** Video tracks laid out in templates, audio tracks with effects
//! - **Request:** One immutable snapshot of everything a compile needs
//!
//! All pixel dimensions are integers; all times are seconds.

pub mod geometry;
pub mod request;
pub mod track;

pub use geometry::*;
pub use request::*;
pub use track::*;
