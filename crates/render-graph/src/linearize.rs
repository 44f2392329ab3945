//! Command linearization: graph + request settings -> ffmpeg argument list.
//!
//! This is the only module that knows ffmpeg's filter-graph text syntax.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use bones_common::error::CompileError;
use bones_timeline_model::request::{OutputMode, RenderRequest};
use serde::Serialize;

use crate::audio_chain::{AudioStage, EchoTap};
use crate::graph::{ColorGrade, FilterGraph, FilterGraphNode, Node, PadLabel, SourceNode};
use crate::sources::SourceRegistry;

/// Image pattern thumbnails are written to, relative to the working directory.
pub const THUMBNAIL_PATTERN: &str = "thumbs/%04d.png";

/// Description metadata stamped on encoded output.
pub const METADATA_DESCRIPTION: &str = "description=Made with VideoBones";

/// Flags every invocation starts with. Progress goes to stdout as key=value
/// lines; the stats line on stderr is suppressed.
const GLOBAL_FLAGS: [&str; 5] = ["-y", "-hide_banner", "-nostats", "-progress", "pipe:1"];

/// The caller-facing operation a compile is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Long-running preview or final render.
    Encode,
    /// Contact-sheet stills.
    Thumbnails,
}

impl EntryPoint {
    /// The entry point that runs `mode`.
    pub fn for_mode(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Thumbnail => EntryPoint::Thumbnails,
            OutputMode::Preview | OutputMode::Render => EntryPoint::Encode,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntryPoint::Encode => "encode",
            EntryPoint::Thumbnails => "thumbnails",
        }
    }

    /// Reject output modes this entry point cannot run.
    pub fn check(self, mode: OutputMode) -> Result<(), CompileError> {
        let allowed = match self {
            EntryPoint::Encode => mode != OutputMode::Thumbnail,
            EntryPoint::Thumbnails => mode == OutputMode::Thumbnail,
        };
        if allowed {
            Ok(())
        } else {
            Err(CompileError::InvalidModeForOperation {
                mode: mode.to_string(),
                operation: self.name(),
            })
        }
    }
}

/// Terminal pads of an assembled graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOutputs {
    pub video: PadLabel,
    pub audio: Option<PadLabel>,
}

impl GraphOutputs {
    /// Pads consumed by `-map` rather than by another node.
    pub fn terminals(&self) -> Vec<PadLabel> {
        std::iter::once(self.video.clone())
            .chain(self.audio.clone())
            .collect()
    }
}

/// A complete processor invocation, minus the binary name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledCommand {
    pub mode: OutputMode,
    /// Arguments in order, ready to hand to the process.
    pub args: Vec<String>,
    /// The `-filter_complex` description, also present in `args`.
    pub filter_graph: String,
    /// Timeline length in seconds.
    pub duration_secs: f64,
    /// Whether an audio stream is mapped to the output.
    pub has_audio: bool,
    /// File or pattern the processor writes, relative to its working
    /// directory unless absolute.
    pub output: PathBuf,
}

impl CompiledCommand {
    /// Arguments joined for logging; not shell-quoted.
    pub fn display_args(&self) -> String {
        self.args.join(" ")
    }
}

/// Serialize `graph` and the request's encoder settings into an argument
/// list for `entry`, which must be able to run the request's output mode.
///
/// Video inputs are declared in source-identity order, then one input per
/// audio track; this matches the indices the assemblers used for `N:v` and
/// `N:a` pads.
pub fn linearize(
    graph: &FilterGraph,
    outputs: &GraphOutputs,
    sources: &SourceRegistry,
    request: &RenderRequest,
    entry: EntryPoint,
) -> Result<CompiledCommand, CompileError> {
    let mode = request.output_mode;
    entry.check(mode)?;
    let mut args = Vec::new();
    push(&mut args, &GLOBAL_FLAGS);

    let native_rate = mode == OutputMode::Preview;
    let inputs = sources
        .iter()
        .map(|(_, path)| path)
        .chain(request.audio_tracks.iter().map(|track| track.file.as_str()));
    for path in inputs {
        if native_rate {
            push(&mut args, &["-re"]);
        }
        push(&mut args, &["-i", path]);
    }

    let filter_graph = render_filter_graph(graph);
    if !filter_graph.is_empty() {
        push(&mut args, &["-filter_complex", &filter_graph]);
    }

    push(&mut args, &["-map", &map_target(&outputs.video)]);
    let has_audio = match &outputs.audio {
        Some(pad) if mode != OutputMode::Thumbnail => {
            push(&mut args, &["-map", &map_target(pad)]);
            true
        }
        _ => false,
    };

    let output = match mode {
        OutputMode::Thumbnail => PathBuf::from(THUMBNAIL_PATTERN),
        OutputMode::Preview => request.preview_manifest.clone(),
        OutputMode::Render => request.output_file.clone(),
    };
    push_trailer(&mut args, request, has_audio, &output);

    Ok(CompiledCommand {
        mode,
        args,
        filter_graph,
        duration_secs: request.duration_secs(),
        has_audio,
        output,
    })
}

fn map_target(pad: &PadLabel) -> String {
    format!("[{pad}]")
}

fn push(args: &mut Vec<String>, items: &[&str]) {
    args.extend(items.iter().map(|s| s.to_string()));
}

fn push_trailer(args: &mut Vec<String>, request: &RenderRequest, has_audio: bool, output: &Path) {
    let aspect = request.aspect_ratio.to_string();
    let output = output.to_string_lossy();

    if request.output_mode == OutputMode::Thumbnail {
        push(args, &["-preset", "ultrafast", "-aspect", &aspect, "-r", "1", &output]);
        return;
    }

    let fps = request.effective_fps().to_string();
    let keyint = format!("keyint={fps}:min-keyint={fps}:no-scenecut");
    let preset = match request.output_mode {
        OutputMode::Preview => "ultrafast",
        _ => "medium",
    };

    push(args, &["-c:v", "libx264", "-preset", preset]);
    if request.output_mode == OutputMode::Preview {
        push(args, &["-tune", "zerolatency"]);
    }
    push(
        args,
        &[
            "-x264opts",
            &keyint,
            "-b:v",
            &request.video_bitrate,
            "-maxrate",
            &request.video_bitrate,
            "-bufsize",
            &request.buffer_size,
            "-r",
            &fps,
            "-aspect",
            &aspect,
        ],
    );
    if has_audio {
        let rate = request.audio_sample_rate.to_string();
        push(
            args,
            &["-c:a", "aac", "-b:a", &request.audio_bitrate, "-ac", "2", "-ar", &rate],
        );
    }
    push(args, &["-metadata", METADATA_DESCRIPTION]);

    match request.output_mode {
        OutputMode::Preview => push(args, &["-f", "dash", &output]),
        _ => push(args, &["-f", "mp4", "-movflags", "+faststart", &output]),
    }
}

/// Render the graph as a `-filter_complex` description, one chain per node
/// in stage order. Declared input streams are referenced directly and emit
/// no chain.
pub fn render_filter_graph(graph: &FilterGraph) -> String {
    graph
        .ordered()
        .into_iter()
        .filter_map(render_node)
        .collect::<Vec<_>>()
        .join(";")
}

fn render_node(node: &Node) -> Option<String> {
    let body = match &node.kind {
        FilterGraphNode::Source(SourceNode::Input { .. }) => return None,
        FilterGraphNode::Source(SourceNode::Color {
            size,
            fps,
            duration_secs,
        }) => format!(
            "color=c=black:s={}x{}:r={fps}:d={duration_secs}",
            size.width, size.height
        ),
        FilterGraphNode::Split { fanout } => format!("split={fanout}"),
        FilterGraphNode::ScaleCrop {
            resolution,
            crop,
            grade,
        } => {
            let mut chain = grade.as_ref().map(render_grade).unwrap_or_default();
            let _ = write!(
                chain,
                "scale={}:{},crop={}:{}:{}:{}",
                resolution.width,
                resolution.height,
                crop.size.width,
                crop.size.height,
                crop.origin.x,
                crop.origin.y
            );
            chain
        }
        FilterGraphNode::Overlay { x, y, enable } => format!(
            "overlay=x={x}:y={y}:enable='gte(t,{})*lt(t,{})':eof_action=pass",
            enable.start, enable.end
        ),
        FilterGraphNode::AudioChain(chain) => chain
            .stages
            .iter()
            .map(render_audio_stage)
            .collect::<Vec<_>>()
            .join(","),
        FilterGraphNode::Mix {
            inputs,
            pad_to_secs,
        } => {
            let mut chain = format!("amix=inputs={inputs}:duration=longest");
            if let Some(secs) = pad_to_secs {
                let _ = write!(chain, ",apad=whole_dur={secs}");
            }
            chain
        }
    };

    let mut out = String::new();
    for pad in &node.inputs {
        let _ = write!(out, "[{pad}]");
    }
    out.push_str(&body);
    for pad in &node.outputs {
        let _ = write!(out, "[{pad}]");
    }
    Some(out)
}

/// Grade filters with a trailing comma, ready to prefix the scale.
fn render_grade(grade: &ColorGrade) -> String {
    let mut out = String::new();
    if let Some(eq) = &grade.eq {
        let _ = write!(
            out,
            "eq=contrast={}:brightness={}:gamma_r={}:gamma_g={}:gamma_b={},",
            eq.contrast, eq.brightness, eq.gamma_r, eq.gamma_g, eq.gamma_b
        );
    }
    if let Some(radius) = grade.blur_radius {
        let _ = write!(out, "avgblur=sizeX={radius},");
    }
    out
}

fn render_audio_stage(stage: &AudioStage) -> String {
    match stage {
        AudioStage::Declick => "adeclick".to_string(),
        AudioStage::Declip => "adeclip".to_string(),
        AudioStage::Echo {
            in_gain,
            out_gain,
            tap,
        } => render_echo(*in_gain, *out_gain, std::slice::from_ref(tap)),
        AudioStage::Reverb {
            in_gain,
            out_gain,
            taps,
        } => render_echo(*in_gain, *out_gain, taps),
        AudioStage::Normalize {
            sample_rate,
            volume,
        } => format!(
            "aformat=sample_fmts=fltp:sample_rates={sample_rate}:channel_layouts=stereo,volume={volume}"
        ),
        AudioStage::Delay { ms } => format!("adelay={ms}|{ms}"),
    }
}

fn render_echo(in_gain: f64, out_gain: f64, taps: &[EchoTap]) -> String {
    let delays: Vec<String> = taps.iter().map(|tap| tap.delay_ms.to_string()).collect();
    let decays: Vec<String> = taps.iter().map(|tap| tap.decay.to_string()).collect();
    format!(
        "aecho={in_gain}:{out_gain}:{}:{}",
        delays.join("|"),
        decays.join("|")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_chain::AudioChain;
    use crate::graph::{Equalizer, StreamKind};
    use bones_timeline_model::geometry::{Interval, Position, Rect, Resolution};

    #[test]
    fn test_entry_points_reject_wrong_modes() {
        assert!(EntryPoint::Encode.check(OutputMode::Render).is_ok());
        assert!(EntryPoint::Encode.check(OutputMode::Preview).is_ok());
        assert_eq!(
            EntryPoint::Encode.check(OutputMode::Thumbnail),
            Err(CompileError::InvalidModeForOperation {
                mode: "thumbnail".to_string(),
                operation: "encode",
            })
        );
        assert!(EntryPoint::Thumbnails.check(OutputMode::Thumbnail).is_ok());
        assert!(EntryPoint::Thumbnails.check(OutputMode::Render).is_err());
        assert_eq!(
            EntryPoint::for_mode(OutputMode::Thumbnail),
            EntryPoint::Thumbnails
        );
        assert_eq!(EntryPoint::for_mode(OutputMode::Preview), EntryPoint::Encode);
    }

    fn background_only(request: &RenderRequest) -> (FilterGraph, GraphOutputs) {
        let mut graph = FilterGraph::new();
        graph.add(
            FilterGraphNode::Source(SourceNode::Color {
                size: request.canvas,
                fps: request.effective_fps(),
                duration_secs: 0.0,
            }),
            vec![],
            vec![PadLabel::new("bg")],
        );
        let outputs = GraphOutputs {
            video: PadLabel::new("bg"),
            audio: None,
        };
        (graph, outputs)
    }

    #[test]
    fn test_linearize_rejects_thumbnail_mode_for_encode() {
        let request = RenderRequest::new(OutputMode::Thumbnail);
        let (graph, outputs) = background_only(&request);
        let sources = SourceRegistry::new();

        let err = linearize(&graph, &outputs, &sources, &request, EntryPoint::Encode).unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidModeForOperation {
                operation: "encode",
                ..
            }
        ));
        assert!(linearize(&graph, &outputs, &sources, &request, EntryPoint::Thumbnails).is_ok());
    }

    #[test]
    fn test_zero_frame_rate_trailer_uses_one_fps() {
        let mut request = RenderRequest::new(OutputMode::Render);
        request.frames_per_second = 0;
        let (graph, outputs) = background_only(&request);

        let command = linearize(
            &graph,
            &outputs,
            &SourceRegistry::new(),
            &request,
            EntryPoint::Encode,
        )
        .unwrap();
        let value_after = |flag: &str| {
            command
                .args
                .windows(2)
                .find(|pair| pair[0] == flag)
                .map(|pair| pair[1].clone())
        };
        assert_eq!(value_after("-r").as_deref(), Some("1"));
        assert_eq!(
            value_after("-x264opts").as_deref(),
            Some("keyint=1:min-keyint=1:no-scenecut")
        );
    }

    #[test]
    fn test_render_scale_crop_with_grade() {
        let mut graph = FilterGraph::new();
        graph.add(
            FilterGraphNode::ScaleCrop {
                resolution: Resolution::new(1920, 1080),
                crop: Rect::new(Position::new(480, 0), Resolution::new(960, 1080)),
                grade: Some(ColorGrade {
                    eq: Some(Equalizer {
                        contrast: 1.5,
                        brightness: 0.0,
                        gamma_r: 1.0,
                        gamma_g: 1.0,
                        gamma_b: 1.0,
                    }),
                    blur_radius: Some(4),
                }),
            },
            vec![PadLabel::input_stream(0, StreamKind::Video)],
            vec![PadLabel::new("tile0")],
        );
        assert_eq!(
            render_filter_graph(&graph),
            "[0:v]eq=contrast=1.5:brightness=0:gamma_r=1:gamma_g=1:gamma_b=1,\
             avgblur=sizeX=4,scale=1920:1080,crop=960:1080:480:0[tile0]"
        );
    }

    #[test]
    fn test_render_overlay_and_split() {
        let mut graph = FilterGraph::new();
        graph.add(
            FilterGraphNode::Overlay {
                x: 960,
                y: 0,
                enable: Interval::new(2.5, 10.0),
            },
            vec![PadLabel::new("bg"), PadLabel::new("tile0")],
            vec![PadLabel::video_out()],
        );
        graph.add(
            FilterGraphNode::Split { fanout: 2 },
            vec![PadLabel::new("0:v")],
            vec![PadLabel::new("src0_0"), PadLabel::new("src0_1")],
        );
        assert_eq!(
            render_filter_graph(&graph),
            "[0:v]split=2[src0_0][src0_1];\
             [bg][tile0]overlay=x=960:y=0:enable='gte(t,2.5)*lt(t,10)':eof_action=pass[vout]"
        );
    }

    #[test]
    fn test_render_audio_chain() {
        let chain = AudioChain {
            track: 0,
            stages: vec![
                AudioStage::Declick,
                AudioStage::Echo {
                    in_gain: 0.6,
                    out_gain: 0.3,
                    tap: EchoTap {
                        delay_ms: 1000.0,
                        decay: 0.5,
                    },
                },
                AudioStage::Normalize {
                    sample_rate: 48_000,
                    volume: 0.5,
                },
                AudioStage::Delay { ms: 250 },
            ],
        };
        let mut graph = FilterGraph::new();
        graph.add(
            FilterGraphNode::AudioChain(chain),
            vec![PadLabel::new("1:a")],
            vec![PadLabel::new("a0")],
        );
        graph.add(
            FilterGraphNode::Mix {
                inputs: 1,
                pad_to_secs: Some(10.0),
            },
            vec![PadLabel::new("a0")],
            vec![PadLabel::audio_out()],
        );
        assert_eq!(
            render_filter_graph(&graph),
            "[1:a]adeclick,aecho=0.6:0.3:1000:0.5,\
             aformat=sample_fmts=fltp:sample_rates=48000:channel_layouts=stereo,volume=0.5,\
             adelay=250|250[a0];\
             [a0]amix=inputs=1:duration=longest,apad=whole_dur=10[aout]"
        );
    }

    #[test]
    fn test_render_reverb_taps() {
        let stage = AudioStage::Reverb {
            in_gain: 0.8,
            out_gain: 0.9,
            taps: vec![
                EchoTap {
                    delay_ms: 100.0,
                    decay: 0.5,
                },
                EchoTap {
                    delay_ms: 200.0,
                    decay: 0.25,
                },
            ],
        };
        assert_eq!(render_audio_stage(&stage), "aecho=0.8:0.9:100|200:0.5|0.25");
    }

    #[test]
    fn test_input_sources_emit_no_chain() {
        let mut graph = FilterGraph::new();
        graph.add(
            FilterGraphNode::Source(SourceNode::Input {
                index: 0,
                stream: StreamKind::Video,
            }),
            vec![],
            vec![PadLabel::new("0:v")],
        );
        graph.add(
            FilterGraphNode::Source(SourceNode::Color {
                size: Resolution::new(640, 360),
                fps: 30,
                duration_secs: 4.0,
            }),
            vec![],
            vec![PadLabel::new("bg")],
        );
        assert_eq!(
            render_filter_graph(&graph),
            "color=c=black:s=640x360:r=30:d=4[bg]"
        );
    }
}
