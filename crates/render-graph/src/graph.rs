//! Filter-graph representation.
//!
//! Nodes are tagged variants; edges are pad labels. A node consumes the pads
//! listed in `inputs` and produces the pads in `outputs`. Nothing here knows
//! the processor's textual filter syntax; see [`crate::linearize`].

use std::collections::HashMap;
use std::fmt;

use bones_timeline_model::geometry::{Interval, Rect, Resolution};
use bones_timeline_model::track::VideoEffects;

use crate::audio_chain::AudioChain;

/// Name of the edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PadLabel(String);

impl PadLabel {
    /// Final composited video.
    pub const VIDEO_OUT: &'static str = "vout";
    /// Final mixed audio.
    pub const AUDIO_OUT: &'static str = "aout";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Pad for stream `kind` of process input `index` (e.g. `2:v`).
    pub fn input_stream(index: usize, kind: StreamKind) -> Self {
        Self(format!("{index}:{}", kind.specifier()))
    }

    pub fn video_out() -> Self {
        Self::new(Self::VIDEO_OUT)
    }

    pub fn audio_out() -> Self {
        Self::new(Self::AUDIO_OUT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PadLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn specifier(self) -> char {
        match self {
            StreamKind::Video => 'v',
            StreamKind::Audio => 'a',
        }
    }
}

/// Where a stream enters the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceNode {
    /// A stream of a declared process input.
    Input { index: usize, stream: StreamKind },
    /// Synthetic solid black frames.
    Color {
        size: Resolution,
        fps: u32,
        duration_secs: f64,
    },
}

/// `eq` adjustment; neutral values are contrast 1, brightness 0, gammas 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equalizer {
    pub contrast: f64,
    pub brightness: f64,
    pub gamma_r: f64,
    pub gamma_g: f64,
    pub gamma_b: f64,
}

/// Per-tile colour and blur adjustments, applied before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorGrade {
    pub eq: Option<Equalizer>,
    pub blur_radius: Option<u32>,
}

impl ColorGrade {
    /// Grade for `effects` after clamping, or `None` when nothing is set.
    pub fn from_effects(effects: &VideoEffects) -> Option<Self> {
        let fx = effects.clamped();
        if fx.is_identity() {
            return None;
        }

        let eq = if fx.brightness.is_some() || fx.contrast.is_some() || fx.balance.is_some() {
            let balance = fx.balance;
            Some(Equalizer {
                contrast: fx.contrast.unwrap_or(1.0),
                brightness: fx.brightness.unwrap_or(0.0),
                gamma_r: balance.map_or(1.0, |b| b.r),
                gamma_g: balance.map_or(1.0, |b| b.g),
                gamma_b: balance.map_or(1.0, |b| b.b),
            })
        } else {
            None
        };

        Some(Self {
            eq,
            blur_radius: fx.blur_radius.map(|r| r.round() as u32),
        })
    }
}

/// One filter-graph node.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterGraphNode {
    Source(SourceNode),
    /// Duplicates one stream into `fanout` copies.
    Split { fanout: usize },
    /// Scale to `resolution`, then crop `crop` out of it.
    ScaleCrop {
        resolution: Resolution,
        crop: Rect,
        grade: Option<ColorGrade>,
    },
    /// Composite the second input over the first at `(x, y)` while the
    /// timeline is inside `enable`.
    Overlay { x: u32, y: u32, enable: Interval },
    AudioChain(AudioChain),
    /// Mix `inputs` streams, lasting as long as the longest, then pad with
    /// silence up to `pad_to_secs`.
    Mix {
        inputs: usize,
        pad_to_secs: Option<f64>,
    },
}

/// Serialization rank of a node; the linearizer emits stages in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Source,
    Split,
    ScaleCrop,
    Overlay,
    AudioChain,
    Mix,
}

impl FilterGraphNode {
    pub fn stage(&self) -> Stage {
        match self {
            FilterGraphNode::Source(_) => Stage::Source,
            FilterGraphNode::Split { .. } => Stage::Split,
            FilterGraphNode::ScaleCrop { .. } => Stage::ScaleCrop,
            FilterGraphNode::Overlay { .. } => Stage::Overlay,
            FilterGraphNode::AudioChain(_) => Stage::AudioChain,
            FilterGraphNode::Mix { .. } => Stage::Mix,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: FilterGraphNode,
    pub inputs: Vec<PadLabel>,
    pub outputs: Vec<PadLabel>,
}

/// Violations of the linear-edge invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EdgeError {
    #[error("pad [{0}] is produced more than once")]
    DuplicateProducer(PadLabel),

    #[error("pad [{0}] is consumed more than once")]
    DuplicateConsumer(PadLabel),

    #[error("pad [{0}] is consumed but never produced")]
    Dangling(PadLabel),

    #[error("pad [{0}] is produced but never consumed or mapped")]
    Unconsumed(PadLabel),
}

/// A directed acyclic filter graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    nodes: Vec<Node>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: FilterGraphNode, inputs: Vec<PadLabel>, outputs: Vec<PadLabel>) {
        self.nodes.push(Node {
            kind,
            inputs,
            outputs,
        });
    }

    /// Append every node of `other`.
    pub fn merge(&mut self, other: FilterGraph) {
        self.nodes.extend(other.nodes);
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Nodes in serialization order: stable-sorted by [`Stage`].
    pub fn ordered(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.iter().collect();
        nodes.sort_by_key(|node| node.kind.stage());
        nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes at `stage`.
    pub fn count(&self, stage: Stage) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.kind.stage() == stage)
            .count()
    }

    /// Check that every pad is produced once and consumed once, treating
    /// `terminals` as consumed by the output mapping.
    pub fn check_edges(&self, terminals: &[PadLabel]) -> Result<(), EdgeError> {
        let mut produced: HashMap<&PadLabel, usize> = HashMap::new();
        let mut consumed: HashMap<&PadLabel, usize> = HashMap::new();

        for node in &self.nodes {
            for pad in &node.outputs {
                *produced.entry(pad).or_default() += 1;
            }
            for pad in &node.inputs {
                *consumed.entry(pad).or_default() += 1;
            }
        }
        for pad in terminals {
            *consumed.entry(pad).or_default() += 1;
        }

        for node in &self.nodes {
            for pad in &node.outputs {
                if produced[pad] > 1 {
                    return Err(EdgeError::DuplicateProducer(pad.clone()));
                }
                match consumed.get(pad) {
                    None => return Err(EdgeError::Unconsumed(pad.clone())),
                    Some(n) if *n > 1 => return Err(EdgeError::DuplicateConsumer(pad.clone())),
                    Some(_) => {}
                }
            }
        }
        for pad in consumed.keys() {
            if !produced.contains_key(pad) {
                return Err(EdgeError::Dangling((*pad).clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bones_timeline_model::geometry::Position;
    use bones_timeline_model::track::ColorBalance;

    fn input(index: usize) -> FilterGraphNode {
        FilterGraphNode::Source(SourceNode::Input {
            index,
            stream: StreamKind::Video,
        })
    }

    fn scale() -> FilterGraphNode {
        FilterGraphNode::ScaleCrop {
            resolution: Resolution::new(960, 540),
            crop: Rect::new(Position::ORIGIN, Resolution::new(960, 540)),
            grade: None,
        }
    }

    #[test]
    fn test_input_stream_labels() {
        assert_eq!(PadLabel::input_stream(0, StreamKind::Video).as_str(), "0:v");
        assert_eq!(PadLabel::input_stream(3, StreamKind::Audio).as_str(), "3:a");
    }

    #[test]
    fn test_ordered_is_stable_by_stage() {
        let mut graph = FilterGraph::new();
        graph.add(scale(), vec![PadLabel::new("0:v")], vec![PadLabel::new("t0")]);
        graph.add(input(0), vec![], vec![PadLabel::new("0:v")]);
        graph.add(scale(), vec![PadLabel::new("1:v")], vec![PadLabel::new("t1")]);
        graph.add(input(1), vec![], vec![PadLabel::new("1:v")]);

        let outputs: Vec<&str> = graph
            .ordered()
            .iter()
            .map(|node| node.outputs[0].as_str())
            .collect();
        assert_eq!(outputs, vec!["0:v", "1:v", "t0", "t1"]);
        assert_eq!(graph.count(Stage::ScaleCrop), 2);
    }

    #[test]
    fn test_check_edges_accepts_linear_graph() {
        let mut graph = FilterGraph::new();
        graph.add(input(0), vec![], vec![PadLabel::new("0:v")]);
        graph.add(scale(), vec![PadLabel::new("0:v")], vec![PadLabel::video_out()]);
        assert_eq!(graph.check_edges(&[PadLabel::video_out()]), Ok(()));
    }

    #[test]
    fn test_check_edges_rejects_fan_out_without_split() {
        let mut graph = FilterGraph::new();
        graph.add(input(0), vec![], vec![PadLabel::new("0:v")]);
        graph.add(scale(), vec![PadLabel::new("0:v")], vec![PadLabel::new("t0")]);
        graph.add(scale(), vec![PadLabel::new("0:v")], vec![PadLabel::new("t1")]);
        assert_eq!(
            graph.check_edges(&[PadLabel::new("t0"), PadLabel::new("t1")]),
            Err(EdgeError::DuplicateConsumer(PadLabel::new("0:v")))
        );
    }

    #[test]
    fn test_check_edges_reports_unmapped_and_dangling() {
        let mut graph = FilterGraph::new();
        graph.add(input(0), vec![], vec![PadLabel::new("0:v")]);
        graph.add(scale(), vec![PadLabel::new("0:v")], vec![PadLabel::new("t0")]);
        assert_eq!(
            graph.check_edges(&[]),
            Err(EdgeError::Unconsumed(PadLabel::new("t0")))
        );

        let mut graph = FilterGraph::new();
        graph.add(scale(), vec![PadLabel::new("9:v")], vec![PadLabel::video_out()]);
        assert_eq!(
            graph.check_edges(&[PadLabel::video_out()]),
            Err(EdgeError::Dangling(PadLabel::new("9:v")))
        );
    }

    #[test]
    fn test_color_grade_from_effects() {
        assert_eq!(ColorGrade::from_effects(&VideoEffects::new("a.mp4")), None);

        let grade = ColorGrade::from_effects(&VideoEffects {
            brightness: Some(0.25),
            balance: Some(ColorBalance {
                r: 1.2,
                g: 1.0,
                b: 0.8,
            }),
            ..VideoEffects::new("a.mp4")
        })
        .unwrap();
        let eq = grade.eq.unwrap();
        assert_eq!(eq.contrast, 1.0);
        assert_eq!(eq.brightness, 0.25);
        assert_eq!(eq.gamma_r, 1.2);
        assert_eq!(grade.blur_radius, None);

        let blur_only = ColorGrade::from_effects(&VideoEffects {
            blur_radius: Some(80.0),
            ..VideoEffects::new("a.mp4")
        })
        .unwrap();
        assert_eq!(blur_only.eq, None);
        assert_eq!(blur_only.blur_radius, Some(50));
    }
}
