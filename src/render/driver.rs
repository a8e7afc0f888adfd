//! Renderer process driver

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use super::error::RenderError;
use super::recipe::ProcessingRecipe;

/// Amount of stderr kept for error reports
pub const STDERR_TAIL_BYTES: usize = 4096;

/// Seam between the orchestrator and the rendering tool
#[async_trait]
pub trait RenderDriver: Send + Sync {
    /// Render one topic map into the recipe's output directory
    async fn execute(
        &self,
        recipe: &ProcessingRecipe,
        cancel: &CancellationToken,
    ) -> Result<(), RenderError>;
}

/// Runs the DITA toolkit command line
#[derive(Debug, Clone, Default)]
pub struct DitaRenderer {
    java_home: Option<PathBuf>,
    timeout: Option<Duration>,
}

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut(Duration),
}

impl DitaRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `JAVA_HOME` added to the inherited environment
    pub fn with_java_home(mut self, java_home: Option<PathBuf>) -> Self {
        self.java_home = java_home;
        self
    }

    /// Kill the renderer when it runs longer than this
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RenderDriver for DitaRenderer {
    async fn execute(
        &self,
        recipe: &ProcessingRecipe,
        cancel: &CancellationToken,
    ) -> Result<(), RenderError> {
        let start_time = Instant::now();

        let mut std_cmd = std::process::Command::new(recipe.executable());
        std_cmd
            .args(recipe.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own group so helpers the launcher starts (the JVM) die with it
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        if let Some(java_home) = &self.java_home {
            std_cmd.env("JAVA_HOME", java_home);
        }

        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(true);

        tracing::info!(
            dita_map = %recipe.dita_map().display(),
            format = %recipe.format(),
            "Starting renderer"
        );

        let mut child = cmd.spawn().map_err(|e| spawn_failed(recipe, e))?;
        let group = child.id();

        let stdout_task = child.stdout.take().map(|out| tokio::spawn(log_stdout(out)));
        let stderr_task = child.stderr.take().map(|err| tokio::spawn(tail(err)));
        let readers = [
            stdout_task.as_ref().map(|t| t.abort_handle()),
            stderr_task.as_ref().map(|t| t.abort_handle()),
        ];

        let deadline = async {
            match self.timeout {
                Some(limit) => {
                    tokio::time::sleep(limit).await;
                    limit
                }
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = cancel.cancelled() => Outcome::Cancelled,
            limit = &mut deadline => Outcome::TimedOut(limit),
        };

        let status = match outcome {
            Outcome::Exited(status) => status,
            Outcome::Cancelled => {
                return Err(stop(recipe, &mut child, group, readers, RenderError::Cancelled).await)
            }
            Outcome::TimedOut(limit) => {
                return Err(
                    stop(recipe, &mut child, group, readers, RenderError::TimedOut(limit)).await,
                )
            }
        };

        // Stragglers still in the group would keep writing and hold the pipes open
        kill_group(group);

        let drained = async {
            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            }
        };

        let stderr_tail = tokio::select! {
            tail = drained => tail,
            _ = cancel.cancelled() => {
                return Err(stop(recipe, &mut child, group, readers, RenderError::Cancelled).await)
            }
            limit = &mut deadline => {
                return Err(
                    stop(recipe, &mut child, group, readers, RenderError::TimedOut(limit)).await,
                )
            }
        };

        let status = status.map_err(|e| RenderError::RenderFailed {
            code: None,
            stderr_tail: format!("failed to wait for renderer: {}", e),
        })?;

        if !status.success() {
            tracing::warn!(
                dita_map = %recipe.dita_map().display(),
                code = ?status.code(),
                "Renderer failed"
            );
            return Err(RenderError::RenderFailed {
                code: status.code(),
                stderr_tail,
            });
        }

        tracing::debug!(
            dita_map = %recipe.dita_map().display(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Renderer finished"
        );

        Ok(())
    }
}

fn spawn_failed(recipe: &ProcessingRecipe, e: std::io::Error) -> RenderError {
    RenderError::RenderFailed {
        code: None,
        stderr_tail: format!(
            "failed to spawn {}: {}",
            recipe.executable().display(),
            e
        ),
    }
}

/// Kill the renderer with its whole group and stop reading its pipes
async fn stop(
    recipe: &ProcessingRecipe,
    child: &mut Child,
    group: Option<u32>,
    readers: [Option<AbortHandle>; 2],
    reason: RenderError,
) -> RenderError {
    kill_group(group);

    // Reaps the launcher; skipped when it already exited
    if matches!(child.try_wait(), Ok(None)) {
        if let Err(e) = child.kill().await {
            tracing::warn!(error = %e, "Failed to kill renderer");
        }
    }
    for reader in readers.into_iter().flatten() {
        reader.abort();
    }

    match &reason {
        RenderError::TimedOut(limit) => {
            tracing::warn!(dita_map = %recipe.dita_map().display(), ?limit, "Renderer timed out")
        }
        _ => tracing::info!(dita_map = %recipe.dita_map().display(), "Renderer cancelled"),
    }

    reason
}

#[cfg(unix)]
fn kill_group(group: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(raw) = group.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to kill renderer process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_group: Option<u32>) {}

async fn log_stdout<R: AsyncRead + Unpin>(out: R) {
    let mut lines = BufReader::new(out).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "dita_pdf_server::renderer", "{}", line);
    }
}

/// Drain a stream, keeping only its last [`STDERR_TAIL_BYTES`]
async fn tail<R: AsyncRead + Unpin>(mut stream: R) -> String {
    let mut kept: Vec<u8> = Vec::with_capacity(STDERR_TAIL_BYTES);
    let mut buf = [0u8; 1024];

    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                kept.extend_from_slice(&buf[..n]);
                if kept.len() > STDERR_TAIL_BYTES {
                    let excess = kept.len() - STDERR_TAIL_BYTES;
                    kept.drain(..excess);
                }
            }
        }
    }

    String::from_utf8_lossy(&kept).into_owned()
}
