//! Per-request working directory

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::error::{Result, WorkdirError};
use crate::manifest::MANIFEST_FILE_NAME;

/// Marker present while the input tree is being mutated
pub const DIRTY_MARKER: &str = ".dirty";

/// Marker present while the owning job is alive.
///
/// Markers hold the request id and the owning process id, one per line.
pub const LOCK_MARKER: &str = "file.lock";

const INPUT_DIR: &str = "input";
const OUTPUT_DIR: &str = "output";
const TMP_DIR: &str = "tmp";

/// Scoped filesystem sandbox owned by a single job
#[derive(Debug)]
pub struct WorkingDirectory {
    owner: Uuid,
    root: PathBuf,
    input: PathBuf,
    output: PathBuf,
    tmp: PathBuf,
}

impl WorkingDirectory {
    /// Allocate a fresh root under `base` and create its subdirectories.
    ///
    /// The root name starts with the request id followed by a random suffix,
    /// so two jobs never share a root even when retried with the same id.
    pub async fn create(owner: Uuid, base: &Path) -> Result<Self> {
        Self::create_with_layout(owner, base, [INPUT_DIR, OUTPUT_DIR, TMP_DIR]).await
    }

    async fn create_with_layout(owner: Uuid, base: &Path, layout: [&str; 3]) -> Result<Self> {
        // Dropping the guard removes the root if a subdirectory fails
        let guard = tempfile::Builder::new()
            .prefix(&owner.to_string())
            .tempdir_in(base)?;

        let [input, output, tmp] = layout.map(|sub| guard.path().join(sub));
        for sub in [&input, &output, &tmp] {
            fs::create_dir(sub).await?;
        }

        let root = guard.keep();
        tracing::debug!(request_id = %owner, root = %root.display(), "Working directory created");

        Ok(Self {
            owner,
            root,
            input,
            output,
            tmp,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn tmp(&self) -> &Path {
        &self.tmp
    }

    /// Path of the manifest inside the input tree
    pub fn manifest_path(&self) -> PathBuf {
        self.input.join(MANIFEST_FILE_NAME)
    }

    // ========================================================================
    // Markers
    // ========================================================================

    pub async fn lock(&self) -> Result<()> {
        self.create_marker(LOCK_MARKER)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => WorkdirError::AlreadyLocked(self.root.clone()),
                _ => WorkdirError::Io(e),
            })
    }

    pub async fn unlock(&self) -> Result<()> {
        fs::remove_file(self.root.join(LOCK_MARKER)).await?;
        Ok(())
    }

    pub async fn mark_dirty(&self) -> Result<()> {
        self.create_marker(DIRTY_MARKER)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => WorkdirError::AlreadyDirty(self.root.clone()),
                _ => WorkdirError::Io(e),
            })
    }

    pub async fn mark_clean(&self) -> Result<()> {
        fs::remove_file(self.root.join(DIRTY_MARKER)).await?;
        Ok(())
    }

    pub async fn is_dirty(&self) -> bool {
        fs::try_exists(self.root.join(DIRTY_MARKER))
            .await
            .unwrap_or(false)
    }

    pub async fn is_locked(&self) -> bool {
        fs::try_exists(self.root.join(LOCK_MARKER))
            .await
            .unwrap_or(false)
    }

    async fn create_marker(&self, name: &str) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.root.join(name))
            .await?;
        let content = format!("{}\n{}\n", self.owner, std::process::id());
        file.write_all(content.as_bytes()).await?;
        file.flush().await
    }

    // ========================================================================
    // Contents
    // ========================================================================

    /// Regular files directly under `output/`, sorted by file name
    pub async fn list_output(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.output).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Delete the whole sandbox.
    ///
    /// Refuses while the dirty marker exists and deletes nothing in that case.
    /// The lock marker does not block the owner.
    pub async fn cleanup(&self) -> Result<()> {
        if self.is_dirty().await {
            return Err(WorkdirError::Dirty(self.root.clone()));
        }

        for sub in [&self.output, &self.input, &self.tmp, &self.root] {
            remove_dir_all_if_exists(sub).await?;
        }

        tracing::debug!(request_id = %self.owner, root = %self.root.display(), "Working directory removed");

        Ok(())
    }
}

async fn remove_dir_all_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn new_dir() -> (TempDir, WorkingDirectory) {
        let base = TempDir::new().unwrap();
        let dir = WorkingDirectory::create(Uuid::new_v4(), base.path())
            .await
            .unwrap();
        (base, dir)
    }

    #[tokio::test]
    async fn test_create_layout() {
        let (base, dir) = new_dir().await;

        assert!(dir.root().starts_with(base.path()));
        assert!(dir.input().is_dir());
        assert!(dir.output().is_dir());
        assert!(dir.tmp().is_dir());
        assert_eq!(dir.manifest_path(), dir.input().join("manifest.xml"));
        assert!(!dir.is_dirty().await);
        assert!(!dir.is_locked().await);
    }

    #[tokio::test]
    async fn test_root_named_after_request_id() {
        let base = TempDir::new().unwrap();
        let id = Uuid::new_v4();

        let first = WorkingDirectory::create(id, base.path()).await.unwrap();
        let second = WorkingDirectory::create(id, base.path()).await.unwrap();

        let name = first.root().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&id.to_string()));
        assert_ne!(first.root(), second.root());
    }

    #[tokio::test]
    async fn test_failed_layout_leaves_no_root() {
        let base = TempDir::new().unwrap();

        let result = WorkingDirectory::create_with_layout(
            Uuid::new_v4(),
            base.path(),
            [INPUT_DIR, "missing/output", TMP_DIR],
        )
        .await;

        assert!(matches!(result, Err(WorkdirError::Io(_))));
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_lock_twice_fails() {
        let (_base, dir) = new_dir().await;

        dir.lock().await.unwrap();
        assert!(dir.is_locked().await);
        assert!(matches!(dir.lock().await, Err(WorkdirError::AlreadyLocked(_))));

        dir.unlock().await.unwrap();
        assert!(!dir.is_locked().await);
        dir.lock().await.unwrap();
    }

    #[tokio::test]
    async fn test_dirty_twice_fails() {
        let (_base, dir) = new_dir().await;

        dir.mark_dirty().await.unwrap();
        assert!(matches!(
            dir.mark_dirty().await,
            Err(WorkdirError::AlreadyDirty(_))
        ));

        dir.mark_clean().await.unwrap();
        assert!(!dir.is_dirty().await);
    }

    #[tokio::test]
    async fn test_markers_record_owner() {
        let base = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        let dir = WorkingDirectory::create(id, base.path()).await.unwrap();

        dir.lock().await.unwrap();
        let content = std::fs::read_to_string(dir.root().join(LOCK_MARKER)).unwrap();
        assert_eq!(content, format!("{}\n{}\n", id, std::process::id()));
    }

    #[tokio::test]
    async fn test_unlock_without_lock_is_io_error() {
        let (_base, dir) = new_dir().await;
        assert!(matches!(dir.unlock().await, Err(WorkdirError::Io(_))));
    }

    #[tokio::test]
    async fn test_list_output_sorted_regular_files() {
        let (_base, dir) = new_dir().await;

        std::fs::write(dir.output().join("b.pdf"), b"b").unwrap();
        std::fs::write(dir.output().join("a.pdf"), b"a").unwrap();
        std::fs::create_dir(dir.output().join("nested")).unwrap();
        std::fs::write(dir.output().join("nested").join("c.pdf"), b"c").unwrap();

        let files = dir.list_output().await.unwrap();
        assert_eq!(files, vec![dir.output().join("a.pdf"), dir.output().join("b.pdf")]);
    }

    #[tokio::test]
    async fn test_cleanup_removes_everything() {
        let (base, dir) = new_dir().await;

        std::fs::write(dir.input().join("manifest.xml"), b"<manifest/>").unwrap();
        std::fs::write(dir.output().join("a.pdf"), b"a").unwrap();
        dir.lock().await.unwrap();

        dir.cleanup().await.unwrap();

        assert!(!dir.root().exists());
        assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_refuses_when_dirty() {
        let (_base, dir) = new_dir().await;

        std::fs::write(dir.input().join("topic.dita"), b"<topic/>").unwrap();
        std::fs::write(dir.output().join("a.pdf"), b"a").unwrap();
        dir.mark_dirty().await.unwrap();

        assert!(matches!(dir.cleanup().await, Err(WorkdirError::Dirty(_))));

        assert!(dir.input().join("topic.dita").exists());
        assert!(dir.output().join("a.pdf").exists());
        assert!(dir.tmp().exists());
    }

    #[tokio::test]
    async fn test_cleanup_twice_is_ok() {
        let (_base, dir) = new_dir().await;

        dir.cleanup().await.unwrap();
        dir.cleanup().await.unwrap();
    }
}
