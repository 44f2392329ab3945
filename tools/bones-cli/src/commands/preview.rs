//! Stream a request as a DASH preview until it ends or is interrupted.

use std::path::PathBuf;

use bones_render_engine::{RenderEngine, RenderProgress};
use bones_timeline_model::request::OutputMode;
use tokio::sync::oneshot;

pub async fn run(engine: RenderEngine, path: PathBuf) -> anyhow::Result<()> {
    let request = super::load_request(&path, Some(OutputMode::Preview))?;

    let (tx, rx) = oneshot::channel();
    let command = engine
        .start(
            &request,
            Box::new(|p: RenderProgress| {
                tracing::debug!(rendered_secs = p.rendered_secs, "Preview progress")
            }),
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        )
        .await?;

    println!(
        "Streaming preview to {}",
        engine.resolve_output(&command.output).display()
    );
    println!("Press Ctrl-C to stop.");

    tokio::select! {
        outcome = rx => {
            let outcome = outcome?;
            if !outcome.is_success() {
                anyhow::bail!("Preview ended: {outcome:?}");
            }
            println!("Preview finished.");
        }
        _ = tokio::signal::ctrl_c() => {
            engine.kill().await;
            println!("\nPreview stopped.");
        }
    }
    Ok(())
}
