//! Generation recipe
//!
//! Per-request orchestrator. Phases run strictly in order:
//!
//! ```text
//! Created -> SetUp -> Extracted -> Processable -> Prepared -> Baked -> Packed -> Done
//! ```
//!
//! Any error moves the recipe to `Failed`. [`GenerationRecipe::run`] drives
//! every phase and always removes the working directory afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::error::{JobError, Result};
use super::types::{Archive, Binary, RequestId, BINARY_MIME_TYPE};
use crate::archive;
use crate::manifest::{self, Manifest};
use crate::render::{OutputFormat, ProcessingRecipe, RenderDriver};
use crate::workdir::WorkingDirectory;

/// Renderer settings shared by every job
#[derive(Debug, Clone)]
pub struct RecipeSettings {
    pub executable: PathBuf,
    pub format: OutputFormat,
    /// Relative paths resolve against the job's input directory
    pub style: Option<PathBuf>,
    pub verbose: bool,
}

impl RecipeSettings {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            format: OutputFormat::default(),
            style: None,
            verbose: false,
        }
    }
}

/// Collaborators injected into every recipe
pub struct RecipeContext {
    /// Parent of the per-request working directories
    pub workdir_base: PathBuf,
    pub settings: RecipeSettings,
    pub driver: Arc<dyn RenderDriver>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeState {
    Created,
    SetUp,
    Extracted,
    Processable,
    Prepared,
    Baked,
    Packed,
    Done,
    Failed,
}

impl RecipeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

pub struct GenerationRecipe {
    request_id: RequestId,
    context: Arc<RecipeContext>,
    cancel: CancellationToken,
    state: RecipeState,
    archive: Option<Archive>,
    workdir: Option<WorkingDirectory>,
    dita_maps: Vec<PathBuf>,
    binary: Option<Binary>,
}

impl GenerationRecipe {
    pub fn new(
        request_id: RequestId,
        archive: Archive,
        context: Arc<RecipeContext>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            request_id,
            context,
            cancel,
            state: RecipeState::Created,
            archive: Some(archive),
            workdir: None,
            dita_maps: Vec::new(),
            binary: None,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn state(&self) -> RecipeState {
        self.state
    }

    pub fn working_directory(&self) -> Option<&WorkingDirectory> {
        self.workdir.as_ref()
    }

    /// Topic maps found by `prepare`, in manifest order
    pub fn dita_maps(&self) -> &[PathBuf] {
        &self.dita_maps
    }

    pub fn binary(&self) -> Option<&Binary> {
        self.binary.as_ref()
    }

    /// Run every phase, then clean up whatever the outcome.
    pub async fn run(mut self) -> Result<Binary> {
        let result = self.run_phases().await;
        self.cleanup().await;

        match &result {
            Ok(binary) => tracing::info!(
                name = %binary.name(),
                size = binary.payload().len(),
                "Job completed"
            ),
            Err(e) => tracing::warn!(error = %e, code = e.code(), "Job failed"),
        }

        result
    }

    async fn run_phases(&mut self) -> Result<Binary> {
        self.set_up().await?;
        self.extract().await?;
        if !self.can_process().await? {
            return Err(JobError::NotProcessable);
        }
        self.prepare().await?;
        self.bake().await?;
        self.pack().await?;
        self.tear_down().await?;

        self.binary.take().ok_or(JobError::NoOutput)
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Allocate and lock the working directory
    pub async fn set_up(&mut self) -> Result<()> {
        self.enter("set_up", RecipeState::Created)?;
        let result = self.allocate().await;
        self.leave(result, RecipeState::SetUp)
    }

    /// Unpack the archive into `input/`
    pub async fn extract(&mut self) -> Result<()> {
        self.enter("extract", RecipeState::SetUp)?;
        let bytes = self
            .archive
            .take()
            .map(Archive::into_bytes)
            .unwrap_or_default();
        let result = self.unpack(bytes).await;
        self.leave(result, RecipeState::Extracted)
    }

    /// Check that the input tree carries a manifest.
    ///
    /// `false` fails the recipe.
    pub async fn can_process(&mut self) -> Result<bool> {
        self.enter("can_process", RecipeState::Extracted)?;

        let result = self
            .workdir()
            .map(|workdir| manifest::is_processable(workdir.input()));

        if let Ok(false) = result {
            tracing::warn!("No manifest found in archive");
            self.state = RecipeState::Failed;
            return result;
        }
        self.leave(result, RecipeState::Processable)
    }

    /// Read the manifest and resolve one topic map per item
    pub async fn prepare(&mut self) -> Result<()> {
        self.enter("prepare", RecipeState::Processable)?;
        let result = self.read_manifest().await;
        self.dita_maps = self.leave(result, RecipeState::Prepared)?;
        Ok(())
    }

    /// Render every topic map in manifest order; the first failure stops.
    pub async fn bake(&mut self) -> Result<()> {
        self.enter("bake", RecipeState::Prepared)?;
        let result = self.render_all().await;
        self.leave(result, RecipeState::Baked)
    }

    /// Package `output/`: one file is passed through, several are zipped.
    pub async fn pack(&mut self) -> Result<()> {
        self.enter("pack", RecipeState::Baked)?;
        let result = self.package().await;
        self.binary = Some(self.leave(result, RecipeState::Packed)?);
        Ok(())
    }

    /// Release the markers once mutation is over
    pub async fn tear_down(&mut self) -> Result<()> {
        self.enter("tear_down", RecipeState::Packed)?;
        let result = self.release().await;
        self.leave(result, RecipeState::Done)
    }

    /// Remove the working directory. Best effort: failures are logged.
    ///
    /// On failure paths the markers this recipe set are cleared first, since
    /// nothing mutates the directory any more.
    pub async fn cleanup(&mut self) {
        let Some(workdir) = self.workdir.take() else {
            return;
        };

        if workdir.is_dirty().await {
            if let Err(e) = workdir.mark_clean().await {
                tracing::warn!(error = %e, "Failed to clear dirty marker");
            }
        }
        if workdir.is_locked().await {
            if let Err(e) = workdir.unlock().await {
                tracing::warn!(error = %e, "Failed to release lock");
            }
        }

        if let Err(e) = workdir.cleanup().await {
            tracing::warn!(error = %e, root = %workdir.root().display(), "Cleanup failed");
        }

        if !self.state.is_terminal() {
            self.state = RecipeState::Failed;
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn enter(&mut self, phase: &'static str, expected: RecipeState) -> Result<()> {
        if self.state != expected {
            let state = self.state;
            self.state = RecipeState::Failed;
            return Err(JobError::PhaseOrder { phase, state });
        }

        if self.cancel.is_cancelled() {
            self.state = RecipeState::Failed;
            return Err(JobError::Cancelled);
        }

        tracing::debug!(phase, "Entering phase");
        Ok(())
    }

    fn leave<T>(&mut self, result: Result<T>, next: RecipeState) -> Result<T> {
        self.state = if result.is_ok() {
            next
        } else {
            RecipeState::Failed
        };
        result
    }

    fn workdir(&self) -> Result<&WorkingDirectory> {
        self.workdir.as_ref().ok_or(JobError::PhaseOrder {
            phase: "working_directory",
            state: self.state,
        })
    }

    async fn allocate(&mut self) -> Result<()> {
        let workdir =
            WorkingDirectory::create(self.request_id.as_uuid(), &self.context.workdir_base)
                .await?;
        self.workdir.insert(workdir).lock().await?;
        Ok(())
    }

    async fn unpack(&self, bytes: Vec<u8>) -> Result<()> {
        let workdir = self.workdir()?;
        workdir.mark_dirty().await?;

        let input = workdir.input().to_path_buf();
        let entries = tokio::task::spawn_blocking(move || archive::unzip(&bytes, &input)).await??;

        tracing::debug!(entries = entries.len(), "Archive extracted");
        Ok(())
    }

    async fn read_manifest(&self) -> Result<Vec<PathBuf>> {
        let workdir = self.workdir()?;
        let manifest_path = workdir.manifest_path();
        let manifest =
            tokio::task::spawn_blocking(move || Manifest::from_path(manifest_path)).await??;

        let dita_maps: Vec<PathBuf> = manifest
            .items()
            .iter()
            .map(|item| workdir.input().join(&item.ditamap))
            .collect();

        tracing::info!(
            version = ?manifest.version,
            items = dita_maps.len(),
            "Manifest parsed"
        );

        Ok(dita_maps)
    }

    async fn render_all(&self) -> Result<()> {
        let workdir = self.workdir()?;
        let settings = &self.context.settings;
        let style = settings
            .style
            .as_deref()
            .map(|s| resolve_style(s, workdir.input()));

        for dita_map in &self.dita_maps {
            let recipe = ProcessingRecipe::builder()
                .executable(&settings.executable)
                .dita_map(dita_map)
                .output_dir(workdir.output())
                .tmp_dir(workdir.tmp())
                .format(settings.format.as_str())
                .style(style.clone())
                .verbose(settings.verbose)
                .build()?;

            self.context.driver.execute(&recipe, &self.cancel).await?;
        }

        Ok(())
    }

    async fn package(&self) -> Result<Binary> {
        let workdir = self.workdir()?;
        let files = workdir.list_output().await?;

        let path = match files.as_slice() {
            [] => return Err(JobError::NoOutput),
            [single] => single.clone(),
            _ => {
                let output = workdir.output().to_path_buf();
                tokio::task::spawn_blocking(move || archive::zip(&output)).await??
            }
        };

        let payload = tokio::fs::read(&path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::debug!(outputs = files.len(), name = %name, "Output packed");

        Binary::new(BINARY_MIME_TYPE, name, payload).ok_or(JobError::NoOutput)
    }

    async fn release(&self) -> Result<()> {
        let workdir = self.workdir()?;
        workdir.mark_clean().await?;
        workdir.unlock().await?;
        Ok(())
    }
}

fn resolve_style(style: &Path, input: &Path) -> PathBuf {
    if style.is_absolute() {
        style.to_path_buf()
    } else {
        input.join(style)
    }
}
