//! The render engine: compiles requests and runs them in process slots.

use std::path::{Path, PathBuf};

use bones_common::config::AppConfig;
use bones_common::error::{BonesError, BonesResult, CompileError};
use bones_render_graph::{compile_for_encode, compile_for_thumbnails, CompiledCommand};
use bones_timeline_model::request::{OutputMode, RenderRequest};
use tokio::sync::{oneshot, Mutex};

use crate::supervisor::{ExitCallback, ProcessKind, ProcessOutcome, ProcessSlot, ProcessSpec, ProgressCallback};

/// Called once a thumbnail run ends with the images found on disk.
pub type ThumbnailsCallback = Box<dyn FnOnce(ProcessOutcome, Vec<PathBuf>) + Send>;

/// Runs compiled commands against the processor binary.
///
/// Keeps one slot for encodes (preview or render) and one for thumbnails;
/// each start kills whatever occupied its slot.
pub struct RenderEngine {
    config: AppConfig,
    binary: PathBuf,
    encode: Mutex<ProcessSlot>,
    thumbnails: Mutex<ProcessSlot>,
}

impl RenderEngine {
    /// Engine using the processor binary `config` resolves to.
    pub fn new(config: AppConfig) -> Self {
        let binary = config.ffmpeg.resolve_binary();
        Self::with_binary(config, binary)
    }

    pub fn with_binary(config: AppConfig, binary: impl Into<PathBuf>) -> Self {
        Self {
            config,
            binary: binary.into(),
            encode: Mutex::new(ProcessSlot::new(ProcessKind::Encode)),
            thumbnails: Mutex::new(ProcessSlot::new(ProcessKind::Thumbnails)),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.config.scratch_dir
    }

    /// Where a processor output path lands: relative paths are taken from
    /// the scratch directory, which is the processor's working directory.
    pub fn resolve_output(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.scratch_dir.join(path)
        }
    }

    /// Start a preview or render, replacing any running encode.
    pub async fn start(
        &self,
        request: &RenderRequest,
        on_progress: ProgressCallback,
        on_exit: ExitCallback,
    ) -> BonesResult<CompiledCommand> {
        let command = compile_for_encode(request)?;
        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;

        let mut slot = self.encode.lock().await;
        // The old encode may still be writing the file we are about to clear.
        slot.kill().await;

        let output = self.resolve_output(&command.output);
        if command.mode == OutputMode::Render && tokio::fs::try_exists(&output).await? {
            tracing::info!(path = %output.display(), "Removing previous render output");
            tokio::fs::remove_file(&output).await?;
        }
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::info!(
            mode = %command.mode,
            output = %output.display(),
            duration_secs = command.duration_secs,
            "Starting encode"
        );
        tracing::debug!(args = %command.display_args(), "Encode arguments");
        slot.start(self.spec_for(&command), on_progress, on_exit).await?;
        Ok(command)
    }

    /// Extract thumbnails into `<scratch>/thumbs`, replacing any running
    /// extraction. The directory is emptied first and listed after exit.
    pub async fn thumbnails(
        &self,
        request: &RenderRequest,
        on_done: ThumbnailsCallback,
    ) -> BonesResult<CompiledCommand> {
        let command = compile_for_thumbnails(request)?;

        let mut slot = self.thumbnails.lock().await;
        slot.kill().await;

        let dir = self.config.thumbnails_dir();
        if tokio::fs::try_exists(&dir).await? {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        tokio::fs::create_dir_all(&dir).await?;

        tracing::info!(dir = %dir.display(), duration_secs = command.duration_secs, "Starting thumbnails");
        tracing::debug!(args = %command.display_args(), "Thumbnail arguments");
        let on_exit: ExitCallback = Box::new(move |outcome| {
            let images = match list_thumbnails(&dir) {
                Ok(images) => images,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to list thumbnails");
                    Vec::new()
                }
            };
            tracing::info!(count = images.len(), "Thumbnails ready");
            on_done(outcome, images);
        });
        slot.start(self.spec_for(&command), Box::new(|_| {}), on_exit)
            .await?;
        Ok(command)
    }

    /// Render to completion and return the output file.
    pub async fn export(
        &self,
        request: &RenderRequest,
        on_progress: ProgressCallback,
    ) -> BonesResult<PathBuf> {
        if request.output_mode != OutputMode::Render {
            return Err(CompileError::InvalidModeForOperation {
                mode: request.output_mode.to_string(),
                operation: "export",
            }
            .into());
        }

        let (tx, rx) = oneshot::channel();
        let command = self
            .start(
                request,
                on_progress,
                Box::new(move |outcome| {
                    let _ = tx.send(outcome);
                }),
            )
            .await?;

        let outcome = rx
            .await
            .map_err(|_| BonesError::process("Render monitor stopped without reporting"))?;
        match outcome {
            ProcessOutcome::Finished { success: true, .. } => Ok(self.resolve_output(&command.output)),
            ProcessOutcome::Finished { code, .. } => Err(BonesError::process(format!(
                "Render failed with exit code {}",
                code.map_or_else(|| "none".to_string(), |c| c.to_string())
            ))),
            ProcessOutcome::Killed => Err(BonesError::process("Render was cancelled")),
            ProcessOutcome::Failed { message } => Err(BonesError::process(message)),
        }
    }

    /// Whether an encode is running.
    pub async fn is_encoding(&self) -> bool {
        self.encode.lock().await.is_running()
    }

    pub async fn kill_encode(&self) {
        self.encode.lock().await.kill().await;
    }

    pub async fn kill_thumbnails(&self) {
        self.thumbnails.lock().await.kill().await;
    }

    /// Kill every running process. Safe to call at any time.
    pub async fn kill(&self) {
        self.kill_encode().await;
        self.kill_thumbnails().await;
    }

    fn spec_for(&self, command: &CompiledCommand) -> ProcessSpec {
        ProcessSpec {
            program: self.binary.clone(),
            args: command.args.clone(),
            working_dir: self.config.scratch_dir.clone(),
            duration_secs: command.duration_secs,
        }
    }
}

/// Image files in `dir`, sorted by name.
pub fn list_thumbnails(dir: &Path) -> BonesResult<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}
