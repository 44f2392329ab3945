//! Print the ffmpeg arguments a request compiles to.

use std::path::PathBuf;

use bones_timeline_model::request::OutputMode;

pub fn run(path: PathBuf, mode: Option<OutputMode>, json: bool) -> anyhow::Result<()> {
    let request = super::load_request(&path, mode)?;
    let command = bones_render_graph::compile(&request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&command)?);
        return Ok(());
    }

    println!("# mode: {}", command.mode);
    println!("# duration: {:.3}s", command.duration_secs);
    println!("# output: {}", command.output.display());
    for arg in &command.args {
        println!("{arg}");
    }
    Ok(())
}
