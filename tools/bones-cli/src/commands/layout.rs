//! Show the regions of a layout template.

use bones_render_graph::layout::{template_for, LayoutKind};
use bones_timeline_model::geometry::Resolution;

pub fn run(kind: &str, width: u32, height: u32) -> anyhow::Result<()> {
    let kind: LayoutKind = kind.parse()?;
    let canvas = Resolution::new(width, height);

    println!(
        "{} ({}) on {canvas}: {} region(s)",
        kind,
        kind.glyph(),
        kind.region_count()
    );
    for (i, region) in template_for(kind, canvas).iter().enumerate() {
        println!(
            "  [{i}] {} at ({}, {})",
            region.size, region.anchor.x, region.anchor.y
        );
    }
    Ok(())
}
