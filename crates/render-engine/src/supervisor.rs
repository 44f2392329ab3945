//! Process slots: at most one running process per kind.
//!
//! Starting a process in an occupied slot kills the occupant and waits for
//! its monitor task to finish before spawning the replacement.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use bones_common::error::{BonesError, BonesResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::progress::{ProgressState, RenderProgress};

/// Called for every completed progress block.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Called exactly once when the process is gone, however it ended.
pub type ExitCallback = Box<dyn FnOnce(ProcessOutcome) + Send>;

/// What a slot is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessKind {
    /// Preview stream or final render.
    Encode,
    Thumbnails,
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessKind::Encode => f.write_str("encode"),
            ProcessKind::Thumbnails => f.write_str("thumbnails"),
        }
    }
}

/// How a supervised process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exited on its own.
    Finished { success: bool, code: Option<i32> },
    /// Killed through its slot.
    Killed,
    /// Waiting on the process failed.
    Failed { message: String },
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Finished { success: true, .. })
    }
}

/// Everything needed to launch one process.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Timeline length used to turn rendered seconds into a fraction.
    pub duration_secs: f64,
}

struct Running {
    kill: oneshot::Sender<()>,
    task: JoinHandle<()>,
    pid: Option<u32>,
}

/// A single-occupant process slot.
pub struct ProcessSlot {
    kind: ProcessKind,
    running: Option<Running>,
}

impl ProcessSlot {
    pub fn new(kind: ProcessKind) -> Self {
        Self {
            kind,
            running: None,
        }
    }

    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    /// Whether a process is still being supervised.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Kill the occupant, if any, and wait until its exit callback has run.
    /// Killing an empty slot is a no-op.
    pub async fn kill(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        tracing::info!(kind = %self.kind, pid = ?running.pid, "Killing process");
        // The monitor may already be gone if the process exited on its own.
        let _ = running.kill.send(());
        if let Err(e) = running.task.await {
            tracing::warn!(kind = %self.kind, error = %e, "Process monitor join failed");
        }
    }

    /// Replace the occupant with a new process.
    pub async fn start(
        &mut self,
        spec: ProcessSpec,
        on_progress: ProgressCallback,
        on_exit: ExitCallback,
    ) -> BonesResult<()> {
        self.kill().await;

        tracing::debug!(kind = %self.kind, program = %spec.program.display(), "Spawning process");
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BonesError::process(format!(
                    "Failed to start {}: {e}",
                    spec.program.display()
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BonesError::process("Failed to capture process stdout"))?;

        let pid = child.id();
        tracing::info!(kind = %self.kind, pid = ?pid, args_len = spec.args.len(), "Process started");

        let (kill_tx, kill_rx) = oneshot::channel();
        let task = tokio::spawn(monitor(
            self.kind,
            child,
            stdout,
            kill_rx,
            spec.duration_secs,
            on_progress,
            on_exit,
        ));

        self.running = Some(Running {
            kill: kill_tx,
            task,
            pid,
        });
        Ok(())
    }
}

/// Relay progress until the process exits or a kill arrives, then report the
/// outcome.
async fn monitor(
    kind: ProcessKind,
    mut child: Child,
    stdout: ChildStdout,
    mut kill_rx: oneshot::Receiver<()>,
    duration_secs: f64,
    on_progress: ProgressCallback,
    on_exit: ExitCallback,
) {
    let mut lines = BufReader::new(stdout).lines();
    let mut state = ProgressState::default();
    let mut stdout_open = true;

    let outcome = loop {
        tokio::select! {
            biased;

            // A dropped sender means the slot itself is gone.
            _ = &mut kill_rx => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(%kind, error = %e, "Failed to kill process");
                }
                break ProcessOutcome::Killed;
            }

            line = lines.next_line(), if stdout_open => match line {
                Ok(Some(line)) => {
                    if state.feed_line(&line) {
                        on_progress(state.report(duration_secs));
                    }
                }
                Ok(None) => stdout_open = false,
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "Failed reading process progress");
                    stdout_open = false;
                }
            },

            status = child.wait(), if !stdout_open => {
                break match status {
                    Ok(status) => ProcessOutcome::Finished {
                        success: status.success(),
                        code: status.code(),
                    },
                    Err(e) => ProcessOutcome::Failed {
                        message: e.to_string(),
                    },
                };
            }
        }
    };

    match &outcome {
        ProcessOutcome::Finished { success: true, .. } => {
            tracing::info!(%kind, rendered_secs = state.out_time_secs, "Process finished")
        }
        other => tracing::warn!(%kind, outcome = ?other, "Process ended without success"),
    }
    on_exit(outcome);
}
