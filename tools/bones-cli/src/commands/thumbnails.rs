//! Extract one thumbnail per second of timeline.

use std::path::PathBuf;

use bones_render_engine::RenderEngine;
use bones_timeline_model::request::OutputMode;
use tokio::sync::oneshot;

pub async fn run(engine: RenderEngine, path: PathBuf) -> anyhow::Result<()> {
    let request = super::load_request(&path, Some(OutputMode::Thumbnail))?;

    let (tx, rx) = oneshot::channel();
    engine
        .thumbnails(
            &request,
            Box::new(move |outcome, images| {
                let _ = tx.send((outcome, images));
            }),
        )
        .await?;

    let (outcome, images) = rx.await?;
    if !outcome.is_success() {
        anyhow::bail!("Thumbnail extraction failed: {outcome:?}");
    }

    println!("{} thumbnail(s):", images.len());
    for image in &images {
        println!("  {}", image.display());
    }
    Ok(())
}
