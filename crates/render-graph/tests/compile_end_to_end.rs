use std::path::PathBuf;

use bones_common::error::{CompileError, TrackRef};
use bones_render_graph::audio_chain::AudioStage;
use bones_render_graph::graph::{FilterGraph, FilterGraphNode};
use bones_render_graph::{compile, compile_for_encode, CompiledCommand, Stage};
use bones_timeline_model::geometry::{Interval, Resolution};
use bones_timeline_model::request::{OutputMode, RenderRequest};
use bones_timeline_model::track::{AudioTrack, VideoTrack};

fn load_fixture(name: &str) -> RenderRequest {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("requests")
        .join(name);

    let content = std::fs::read_to_string(path).expect("fixture request should be readable");
    RenderRequest::from_json(&content).expect("fixture request should parse")
}

/// Flag values in `args`, one per occurrence of `flag`.
fn values_of<'a>(command: &'a CompiledCommand, flag: &str) -> Vec<&'a str> {
    command
        .args
        .windows(2)
        .filter(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
        .collect()
}

/// Number of chains in the filter text whose first filter is `filter`.
fn count_chains(command: &CompiledCommand, filter: &str) -> usize {
    command
        .filter_graph
        .split(';')
        .filter(|chain| {
            let mut body = *chain;
            while let Some(rest) = body.strip_prefix('[') {
                body = rest.split_once(']').map_or("", |(_, tail)| tail);
            }
            body.starts_with(filter)
        })
        .count()
}

fn single_track_render() -> RenderRequest {
    let mut request = RenderRequest::new(OutputMode::Render);
    request.video_tracks.push(VideoTrack::single(
        "talk.mp4",
        Resolution::FULL_HD,
        Interval::new(0.0, 10.0),
    ));
    request
        .audio_tracks
        .push(AudioTrack::new("talk.webm").with_volume(0.5));
    request
}

#[test]
fn single_track_render_end_to_end() {
    let request = single_track_render();
    let command = compile_for_encode(&request).unwrap();

    assert_eq!(command.mode, OutputMode::Render);
    assert_eq!(command.duration_secs, 10.0);
    assert!(command.has_audio);
    assert_eq!(
        command.filter_graph,
        "[0:v]scale=1920:1080,crop=1920:1080:0:0[vout];\
         [1:a]aformat=sample_fmts=fltp:sample_rates=48000:channel_layouts=stereo,volume=0.5[a0];\
         [a0]amix=inputs=1:duration=longest,apad=whole_dur=10[aout]"
    );

    assert_eq!(values_of(&command, "-i"), vec!["talk.mp4", "talk.webm"]);
    assert_eq!(values_of(&command, "-map"), vec!["[vout]", "[aout]"]);
    assert_eq!(values_of(&command, "-preset"), vec!["medium"]);
    assert_eq!(values_of(&command, "-f"), vec!["mp4"]);
    assert!(!command.args.iter().any(|a| a == "-re"));
    assert!(!command.args.iter().any(|a| a == "-tune"));
    assert_eq!(command.args.last().map(String::as_str), Some("output.mp4"));
    assert_eq!(command.output, PathBuf::from("output.mp4"));
}

#[test]
fn single_track_render_graph_shape() {
    let request = single_track_render();
    let mut sources = bones_render_graph::SourceRegistry::new();
    let settings = bones_render_graph::video_graph::VideoSettings {
        canvas: request.canvas,
        fps: request.frames_per_second,
        duration_secs: request.duration_secs(),
        effects: &request.video_effects,
    };
    let (video, _) =
        bones_render_graph::video_graph::assemble(&request.video_tracks, &mut sources, &settings)
            .unwrap();
    let (audio, _) = bones_render_graph::audio_mix::assemble(
        &request.audio_tracks,
        request.audio_sample_rate,
        sources.len(),
        request.duration_secs(),
    )
    .unwrap()
    .unwrap();

    let mut graph = FilterGraph::new();
    graph.merge(video);
    graph.merge(audio);

    assert_eq!(graph.count(Stage::ScaleCrop), 1);
    assert_eq!(graph.count(Stage::Overlay), 0);
    assert_eq!(graph.count(Stage::AudioChain), 1);

    let chain = graph
        .nodes()
        .iter()
        .find_map(|node| match &node.kind {
            FilterGraphNode::AudioChain(chain) => Some(chain),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        chain.stages,
        vec![AudioStage::Normalize {
            sample_rate: 48_000,
            volume: 0.5
        }]
    );
}

#[test]
fn quad_track_needs_four_files() {
    let quad = |files: &[&str]| {
        let mut request = RenderRequest::new(OutputMode::Render);
        request.video_tracks.push(VideoTrack::new(
            "quad",
            files.iter().map(|f| f.to_string()).collect(),
            vec![Resolution::new(1280, 720); files.len()],
            Interval::new(0.0, 5.0),
        ));
        request
    };

    let err = compile(&quad(&["a.mp4", "b.mp4", "c.mp4"])).unwrap_err();
    assert!(matches!(
        err,
        CompileError::LayoutMismatch {
            track: TrackRef::Video(0),
            expected: 4,
            actual: 3,
            ..
        }
    ));

    let command = compile(&quad(&["a.mp4", "b.mp4", "c.mp4", "d.mp4"])).unwrap();
    assert_eq!(values_of(&command, "-i").len(), 4);
    assert_eq!(count_chains(&command, "overlay"), 4);
}

#[test]
fn unknown_layout_is_rejected() {
    let mut request = RenderRequest::new(OutputMode::Render);
    request.video_tracks.push(VideoTrack::new(
        "pip",
        vec!["a.mp4".into()],
        vec![Resolution::FULL_HD],
        Interval::new(0.0, 5.0),
    ));
    assert_eq!(
        compile(&request),
        Err(CompileError::InvalidLayoutKind {
            name: "pip".to_string()
        })
    );
}

#[test]
fn empty_request_maps_background() {
    let command = compile(&RenderRequest::new(OutputMode::Render)).unwrap();
    assert_eq!(command.duration_secs, 0.0);
    assert!(!command.has_audio);
    assert_eq!(command.filter_graph, "color=c=black:s=1920x1080:r=60:d=0[bg]");
    assert_eq!(values_of(&command, "-map"), vec!["[bg]"]);
    assert!(values_of(&command, "-i").is_empty());
}

#[test]
fn fixture_preview_shares_and_splits_sources() {
    let request = load_fixture("quad-preview.json");
    let command = compile_for_encode(&request).unwrap();

    // Video sources first in first-seen order, then audio tracks.
    assert_eq!(
        values_of(&command, "-i"),
        vec!["camera.mp4", "slides.mp4", "phone.mp4", "voice.webm", "music.mp3"]
    );
    let re_count = command.args.iter().filter(|a| *a == "-re").count();
    assert_eq!(re_count, 5);

    assert!(command.filter_graph.contains("[0:v]split=2[src0_0][src0_1]"));
    assert!(command.filter_graph.contains("color=c=black:s=640x360:r=30:d=15[blank3]"));
    assert!(command.filter_graph.contains("[3:a]adeclick,aformat="));
    assert!(command.filter_graph.contains("[4:a]aecho=0.8:0.9:120|240|360"));
    assert!(command.filter_graph.contains("adelay=2000|2000[a1]"));
    assert!(command.filter_graph.contains("eq=contrast=1.2:brightness=0.1"));
    assert!(command
        .filter_graph
        .contains("enable='gte(t,6)*lt(t,15)':eof_action=pass[vout]"));
    assert_eq!(count_chains(&command, "overlay"), 5);

    assert_eq!(values_of(&command, "-preset"), vec!["ultrafast"]);
    assert_eq!(values_of(&command, "-tune"), vec!["zerolatency"]);
    assert_eq!(values_of(&command, "-f"), vec!["dash"]);
    assert_eq!(values_of(&command, "-aspect"), vec!["16:9"]);
    assert_eq!(values_of(&command, "-x264opts"), vec!["keyint=30:min-keyint=30:no-scenecut"]);
    assert_eq!(command.args.last().map(String::as_str), Some("stream.mpd"));
}

#[test]
fn fixture_as_thumbnails_drops_audio_path() {
    let mut request = load_fixture("quad-preview.json");
    request.output_mode = OutputMode::Thumbnail;
    let command = bones_render_graph::compile_for_thumbnails(&request).unwrap();

    assert!(!command.has_audio);
    assert!(!command.args.iter().any(|a| a == "-re"));
    assert_eq!(values_of(&command, "-map"), vec!["[vout]"]);
    assert_eq!(values_of(&command, "-r"), vec!["1"]);
    assert_eq!(values_of(&command, "-preset"), vec!["ultrafast"]);
    assert_eq!(count_chains(&command, "amix"), 0);
    assert_eq!(
        command.args.last().map(String::as_str),
        Some("thumbs/%04d.png")
    );
}

#[test]
fn zero_frame_rate_is_raised_everywhere() {
    let mut request = RenderRequest::new(OutputMode::Render);
    request.frames_per_second = 0;
    request.video_tracks.push(VideoTrack::single(
        "late.mp4",
        Resolution::FULL_HD,
        Interval::new(2.0, 10.0),
    ));
    let command = compile_for_encode(&request).unwrap();

    assert!(command
        .filter_graph
        .starts_with("color=c=black:s=1920x1080:r=1:d=10[bg]"));
    assert_eq!(values_of(&command, "-r"), vec!["1"]);
    assert_eq!(
        values_of(&command, "-x264opts"),
        vec!["keyint=1:min-keyint=1:no-scenecut"]
    );
}

#[test]
fn tiny_canvas_is_rejected_before_any_input() {
    let mut request = RenderRequest::new(OutputMode::Render);
    request.canvas = Resolution::new(1, 1);
    request.video_tracks.push(VideoTrack::new(
        "banner-top",
        vec!["a.mp4".into(), "b.mp4".into(), "c.mp4".into()],
        vec![Resolution::FULL_HD; 3],
        Interval::new(0.0, 5.0),
    ));
    assert!(matches!(
        compile(&request),
        Err(CompileError::InvalidCanvas { .. })
    ));
}

#[test]
fn compile_is_deterministic() {
    let request = load_fixture("quad-preview.json");
    assert_eq!(compile(&request).unwrap(), compile(&request).unwrap());
}
