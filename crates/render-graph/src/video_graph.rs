//! Video filter-graph assembly.
//!
//! Every tile becomes a scale/crop of its source composited onto a running
//! canvas pad, gated to the tile's interval. Sources consumed by more than one
//! tile are split first so each pad is read exactly once.

use bones_common::error::{CompileError, TrackRef};
use bones_timeline_model::geometry::{Interval, Resolution};
use bones_timeline_model::track::{VideoEffects, VideoTrack};

use crate::graph::{ColorGrade, FilterGraph, FilterGraphNode, PadLabel, SourceNode, StreamKind};
use crate::layout::{fit_and_crop, template_for, Fit, LayoutKind, Region};
use crate::sources::{SourceId, SourceRegistry};

/// Pad of the solid background the tiles are composited onto.
pub const BACKGROUND_PAD: &str = "bg";

/// Canvas-wide settings the assembler needs from the request.
#[derive(Debug, Clone, Copy)]
pub struct VideoSettings<'a> {
    pub canvas: Resolution,
    pub fps: u32,
    /// Length of the background and blank-tile sources.
    pub duration_secs: f64,
    pub effects: &'a [VideoEffects],
}

impl<'a> VideoSettings<'a> {
    /// Effects for `file`; the last matching entry wins.
    fn effects_for(&self, file: &str) -> Option<&'a VideoEffects> {
        self.effects.iter().rev().find(|fx| fx.file == file)
    }
}

/// A validated region instance, before any node is emitted.
#[derive(Debug, Clone)]
struct Tile<'t> {
    file: Option<&'t str>,
    fit: Fit,
    region: Region,
    interval: Interval,
}

/// Check every track and expand it into tiles in track order, then region
/// order. Nothing is registered or emitted if any track is invalid.
fn plan_tiles<'t>(tracks: &'t [VideoTrack], canvas: Resolution) -> Result<Vec<Tile<'t>>, CompileError> {
    if canvas.is_empty() {
        return Err(CompileError::InvalidCanvas {
            size: canvas.to_string(),
            reason: "width and height must be non-zero".to_string(),
        });
    }

    let mut tiles = Vec::new();

    for (index, track) in tracks.iter().enumerate() {
        let track_ref = TrackRef::Video(index);
        let kind: LayoutKind = track.layout.parse()?;

        if track.files.len() != kind.region_count() {
            return Err(CompileError::LayoutMismatch {
                track: track_ref,
                layout: kind.name().to_string(),
                field: "files",
                expected: kind.region_count(),
                actual: track.files.len(),
            });
        }
        if track.resolutions.len() != track.files.len() {
            return Err(CompileError::LayoutMismatch {
                track: track_ref,
                layout: kind.name().to_string(),
                field: "resolutions",
                expected: track.files.len(),
                actual: track.resolutions.len(),
            });
        }
        if !track.interval.is_valid() {
            return Err(CompileError::invalid_parameter(
                track_ref,
                "interval",
                format!("[{}, {})", track.interval.start, track.interval.end),
            ));
        }

        let regions = template_for(kind, canvas);
        if regions.iter().any(|region| region.size.is_empty()) {
            return Err(CompileError::InvalidCanvas {
                size: canvas.to_string(),
                reason: format!("too small for the {kind} layout"),
            });
        }

        for ((file, native), region) in track.files.iter().zip(&track.resolutions).zip(regions) {
            let file = (!file.is_empty()).then_some(file.as_str());
            // Blank tiles are synthesized at their region size.
            let native = if file.is_some() { *native } else { region.size };
            let fit = fit_and_crop(native, region.size).ok_or_else(|| {
                CompileError::invalid_parameter(track_ref, "resolution", native)
            })?;
            tiles.push(Tile {
                file,
                fit,
                region,
                interval: track.interval,
            });
        }
    }

    Ok(tiles)
}

/// Hands out the pad each consumer of a source should read.
struct SourcePads {
    next: Vec<usize>,
    split: Vec<bool>,
}

impl SourcePads {
    fn take(&mut self, id: SourceId) -> PadLabel {
        let i = id.index();
        if self.split[i] {
            let k = self.next[i];
            self.next[i] += 1;
            PadLabel::new(format!("src{id}_{k}"))
        } else {
            PadLabel::input_stream(i, StreamKind::Video)
        }
    }
}

/// Emit input streams and the splits for shared sources.
///
/// Entries no tile consumes are still declared as process inputs, which keeps
/// input indices stable, but get no stream node.
fn emit_sources(graph: &mut FilterGraph, sources: &SourceRegistry) -> SourcePads {
    let mut split = Vec::with_capacity(sources.len());

    for (id, path) in sources.iter() {
        let uses = sources.usage_count(id);
        if uses == 0 {
            tracing::debug!(source = %id, path, "Skipping unused source");
            split.push(false);
            continue;
        }

        let stream = PadLabel::input_stream(id.index(), StreamKind::Video);
        graph.add(
            FilterGraphNode::Source(SourceNode::Input {
                index: id.index(),
                stream: StreamKind::Video,
            }),
            vec![],
            vec![stream.clone()],
        );

        if uses > 1 {
            tracing::debug!(source = %id, path, uses, "Splitting shared source");
            let outputs = (0..uses)
                .map(|k| PadLabel::new(format!("src{id}_{k}")))
                .collect();
            graph.add(FilterGraphNode::Split { fanout: uses }, vec![stream], outputs);
        }
        split.push(uses > 1);
    }

    SourcePads {
        next: vec![0; split.len()],
        split,
    }
}

/// Build the video half of the graph.
///
/// Returns the graph and the pad carrying the final composited video. Tiles
/// register their sources in `sources`, whose identities become the process
/// input indices.
pub fn assemble(
    tracks: &[VideoTrack],
    sources: &mut SourceRegistry,
    settings: &VideoSettings<'_>,
) -> Result<(FilterGraph, PadLabel), CompileError> {
    let tiles = plan_tiles(tracks, settings.canvas)?;

    let ids: Vec<Option<SourceId>> = tiles
        .iter()
        .map(|tile| tile.file.map(|path| sources.acquire(path)))
        .collect();

    let mut graph = FilterGraph::new();
    let mut pads = emit_sources(&mut graph, sources);

    let color = |size: Resolution| {
        FilterGraphNode::Source(SourceNode::Color {
            size,
            fps: settings.fps,
            duration_secs: settings.duration_secs,
        })
    };

    // A lone full-canvas tile from t=0 needs no background to sit on.
    if let [tile] = tiles.as_slice() {
        if tile.region.covers_canvas(settings.canvas) && tile.interval.start == 0.0 {
            let input = match ids[0] {
                Some(id) => pads.take(id),
                None => {
                    let pad = PadLabel::new("blank0");
                    graph.add(color(tile.region.size), vec![], vec![pad.clone()]);
                    pad
                }
            };
            graph.add(scale_crop(tile, settings), vec![input], vec![PadLabel::video_out()]);
            return Ok((graph, PadLabel::video_out()));
        }
    }

    let mut canvas = PadLabel::new(BACKGROUND_PAD);
    graph.add(color(settings.canvas), vec![], vec![canvas.clone()]);

    for (n, (tile, id)) in tiles.iter().zip(&ids).enumerate() {
        let input = match id {
            Some(id) => pads.take(*id),
            None => {
                let pad = PadLabel::new(format!("blank{n}"));
                graph.add(color(tile.region.size), vec![], vec![pad.clone()]);
                pad
            }
        };

        let scaled = PadLabel::new(format!("tile{n}"));
        graph.add(scale_crop(tile, settings), vec![input], vec![scaled.clone()]);

        let next = if n + 1 == tiles.len() {
            PadLabel::video_out()
        } else {
            PadLabel::new(format!("canvas{n}"))
        };
        graph.add(
            FilterGraphNode::Overlay {
                x: tile.region.anchor.x,
                y: tile.region.anchor.y,
                enable: tile.interval,
            },
            vec![canvas, scaled],
            vec![next.clone()],
        );
        canvas = next;
    }

    tracing::debug!(
        tiles = tiles.len(),
        sources = sources.len(),
        output = %canvas,
        "Assembled video graph"
    );
    Ok((graph, canvas))
}

fn scale_crop(tile: &Tile<'_>, settings: &VideoSettings<'_>) -> FilterGraphNode {
    let fit = tile.fit;
    let grade = tile
        .file
        .and_then(|file| settings.effects_for(file))
        .and_then(ColorGrade::from_effects);

    FilterGraphNode::ScaleCrop {
        resolution: fit.fitted,
        crop: fit.crop,
        grade,
    }
}
