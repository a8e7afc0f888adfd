//! Application directory
//!
//! Parent of every working directory created by this process. It is swept
//! at startup (leftovers of a crashed process) and again at shutdown.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::error::{Result, WorkdirError};
use super::working_directory::{DIRTY_MARKER, LOCK_MARKER};

/// Per-process parent directory for job roots
#[derive(Debug, Clone)]
pub struct ApplicationDirectory {
    name: String,
    path: PathBuf,
}

/// Outcome of the startup sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Job directories removed
    pub removed: usize,
    /// Of which still carried a dirty marker
    pub dirty: usize,
    /// Of which still carried a lock marker
    pub locked: usize,
    /// Locked job directories kept because their owner may still be running
    pub kept: usize,
}

impl ApplicationDirectory {
    /// Resolve the application directory without touching the filesystem
    /// beyond checking that a custom root exists.
    pub fn create(name: &str, root_path: Option<&Path>, use_native_temp: bool) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkdirError::InvalidName);
        }

        let base = if use_native_temp {
            std::env::temp_dir()
        } else {
            let root = root_path.ok_or(WorkdirError::MissingRootPath)?;
            if !root.is_dir() {
                return Err(WorkdirError::RootNotFound(root.to_path_buf()));
            }
            root.to_path_buf()
        };

        Ok(Self {
            name: name.to_string(),
            path: base.join(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory if it does not exist yet
    pub async fn init(&self) -> Result<()> {
        match fs::metadata(&self.path).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(WorkdirError::NotADirectory(self.path.clone())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.path).await?;
                tracing::info!(path = %self.path.display(), "Application directory created");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every job directory left by a previous process.
    ///
    /// A locked directory whose owning process is still running belongs to
    /// another server sharing this directory and is kept. Must run before
    /// the server accepts requests.
    pub async fn recover(&self) -> Result<RecoveryReport> {
        let mut report = RecoveryReport::default();

        for job in self.job_dirs().await? {
            let dirty = marker_exists(&job, DIRTY_MARKER).await;
            let locked = marker_exists(&job, LOCK_MARKER).await;

            if locked && lock_holder_alive(&job).await {
                tracing::info!(path = %job.display(), "Keeping working directory of a running job");
                report.kept += 1;
                continue;
            }

            tracing::warn!(
                path = %job.display(),
                dirty,
                locked,
                "Removing leftover working directory"
            );

            fs::remove_dir_all(&job).await?;

            report.removed += 1;
            report.dirty += usize::from(dirty);
            report.locked += usize::from(locked);
        }

        Ok(report)
    }

    /// Remove job directories that are no longer locked, then the
    /// application directory itself when nothing is left.
    ///
    /// Returns whether the application directory is gone.
    pub async fn shutdown(&self) -> Result<bool> {
        if !fs::try_exists(&self.path).await? {
            return Ok(true);
        }

        let mut in_flight = 0usize;
        for job in self.job_dirs().await? {
            if marker_exists(&job, LOCK_MARKER).await {
                in_flight += 1;
                continue;
            }
            fs::remove_dir_all(&job).await?;
        }

        if in_flight > 0 {
            tracing::warn!(in_flight, "Jobs still running, keeping application directory");
            return Ok(false);
        }

        // Stray non-directory entries keep the directory alive
        if fs::read_dir(&self.path).await?.next_entry().await?.is_some() {
            return Ok(false);
        }

        fs::remove_dir(&self.path).await?;
        Ok(true)
    }

    async fn job_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        let mut entries = match fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(dirs),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                dirs.push(entry.path());
            }
        }

        dirs.sort();
        Ok(dirs)
    }
}

async fn marker_exists(job: &Path, marker: &str) -> bool {
    fs::try_exists(job.join(marker)).await.unwrap_or(false)
}

/// Whether the process named in the lock marker still runs.
///
/// Unreadable markers count as alive. Our own pid counts as dead: the sweep
/// runs before this process starts any job, so a match is a reused pid.
async fn lock_holder_alive(job: &Path) -> bool {
    let content = match fs::read_to_string(job.join(LOCK_MARKER)).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return false,
        Err(_) => return true,
    };

    match content.lines().nth(1).and_then(|pid| pid.trim().parse::<u32>().ok()) {
        Some(pid) if pid == std::process::id() => false,
        Some(pid) => process_alive(pid),
        None => true,
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return true;
    };
    // Signal 0 probes for existence; EPERM means it exists under another user
    !matches!(kill(Pid::from_raw(raw), None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
