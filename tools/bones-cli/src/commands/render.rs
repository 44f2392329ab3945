//! Render a request to a single file.

use std::io::Write;
use std::path::PathBuf;

use bones_render_engine::{RenderEngine, RenderProgress};
use bones_timeline_model::request::OutputMode;

pub async fn run(engine: RenderEngine, path: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut request = super::load_request(&path, Some(OutputMode::Render))?;
    if let Some(output) = output {
        request.output_file = output;
    }

    println!("Rendering {}", path.display());
    println!("  ffmpeg: {}", engine.binary().display());
    println!("  Output: {}", engine.resolve_output(&request.output_file).display());
    println!("  Duration: {:.1}s", request.duration_secs());

    let progress_cb: Box<dyn Fn(RenderProgress) + Send> = Box::new(|p| {
        print!(
            "\r  Progress: {:.1}% ({:.1}s, {} frames)  ",
            p.fraction * 100.0,
            p.rendered_secs,
            p.frames
        );
        let _ = std::io::stdout().flush();
    });

    let rendered = tokio::select! {
        result = engine.export(&request, progress_cb) => result,
        _ = tokio::signal::ctrl_c() => {
            engine.kill().await;
            anyhow::bail!("\nRender interrupted");
        }
    };

    match rendered {
        Ok(path) => {
            println!("\nRender complete: {}", path.display());
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("\nRender failed: {e}")),
    }
}
