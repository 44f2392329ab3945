//! Audio mix assembly: one effect chain per track, mixed into a single pad.

use bones_common::error::CompileError;
use bones_timeline_model::track::AudioTrack;

use crate::audio_chain::{self, AudioChain};
use crate::graph::{FilterGraph, FilterGraphNode, PadLabel, SourceNode, StreamKind};

/// Build the audio half of the graph.
///
/// Track `i` is read from process input `input_offset + i`. The mix lasts as
/// long as its longest input and is then padded with silence up to
/// `timeline_secs`. Returns `None` when there are no tracks.
pub fn assemble(
    tracks: &[AudioTrack],
    sample_rate: u32,
    input_offset: usize,
    timeline_secs: f64,
) -> Result<Option<(FilterGraph, PadLabel)>, CompileError> {
    let chains = tracks
        .iter()
        .enumerate()
        .map(|(index, track)| audio_chain::build(track, index, sample_rate))
        .collect::<Result<Vec<AudioChain>, _>>()?;

    if chains.is_empty() {
        return Ok(None);
    }

    let mut graph = FilterGraph::new();
    let mut mixed = Vec::with_capacity(chains.len());

    for chain in chains {
        let index = input_offset + chain.track;
        let stream = PadLabel::input_stream(index, StreamKind::Audio);
        graph.add(
            FilterGraphNode::Source(SourceNode::Input {
                index,
                stream: StreamKind::Audio,
            }),
            vec![],
            vec![stream.clone()],
        );

        let out = PadLabel::new(format!("a{}", chain.track));
        graph.add(FilterGraphNode::AudioChain(chain), vec![stream], vec![out.clone()]);
        mixed.push(out);
    }

    let pad_to_secs = (timeline_secs.is_finite() && timeline_secs > 0.0).then_some(timeline_secs);
    let inputs = mixed.len();
    graph.add(
        FilterGraphNode::Mix {
            inputs,
            pad_to_secs,
        },
        mixed,
        vec![PadLabel::audio_out()],
    );

    tracing::debug!(tracks = inputs, input_offset, ?pad_to_secs, "Assembled audio mix");
    Ok(Some((graph, PadLabel::audio_out())))
}
