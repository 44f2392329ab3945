//! Compile entry points: one [`RenderRequest`] in, one [`CompiledCommand`] out.

use bones_common::error::CompileError;
use bones_timeline_model::request::{OutputMode, RenderRequest};

use crate::audio_mix;
use crate::linearize::{linearize, CompiledCommand, EntryPoint, GraphOutputs};
use crate::sources::SourceRegistry;
use crate::video_graph::{self, VideoSettings};

/// Compile `request` for whatever output mode it names.
///
/// All validation happens before anything is serialized; on error no partial
/// command exists.
pub fn compile(request: &RenderRequest) -> Result<CompiledCommand, CompileError> {
    compile_as(request, EntryPoint::for_mode(request.output_mode))
}

/// Compile for a long-running preview or render.
pub fn compile_for_encode(request: &RenderRequest) -> Result<CompiledCommand, CompileError> {
    compile_as(request, EntryPoint::Encode)
}

/// Compile for thumbnail extraction.
pub fn compile_for_thumbnails(request: &RenderRequest) -> Result<CompiledCommand, CompileError> {
    compile_as(request, EntryPoint::Thumbnails)
}

fn compile_as(request: &RenderRequest, entry: EntryPoint) -> Result<CompiledCommand, CompileError> {
    let duration_secs = request.duration_secs();
    let settings = VideoSettings {
        canvas: request.canvas,
        fps: request.effective_fps(),
        duration_secs,
        effects: &request.video_effects,
    };

    let mut sources = SourceRegistry::new();
    let (mut graph, video) = video_graph::assemble(&request.video_tracks, &mut sources, &settings)?;

    // Audio is validated in every mode but only wired up when it is encoded.
    let mix = audio_mix::assemble(
        &request.audio_tracks,
        request.audio_sample_rate,
        sources.len(),
        duration_secs,
    )?;
    let audio = match mix {
        Some((audio_graph, pad)) if request.output_mode != OutputMode::Thumbnail => {
            graph.merge(audio_graph);
            Some(pad)
        }
        _ => None,
    };

    let outputs = GraphOutputs { video, audio };
    debug_assert!(
        graph.check_edges(&outputs.terminals()).is_ok(),
        "assembled graph has malformed edges"
    );

    let command = linearize(&graph, &outputs, &sources, request, entry)?;
    tracing::debug!(
        mode = %command.mode,
        nodes = graph.len(),
        inputs = sources.len() + request.audio_tracks.len(),
        duration_secs,
        "Compiled render request"
    );
    Ok(command)
}
