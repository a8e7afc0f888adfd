//! Job entry point

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::error::Result;
use super::recipe::{GenerationRecipe, RecipeContext, RecipeSettings};
use super::types::{
    Archive, ArchiveFields, Binary, GeneratePdfRequest, GeneratePdfResponse, RequestId,
};
use crate::render::RenderDriver;
use crate::workdir::ApplicationDirectory;

/// Turns uploaded archives into packaged PDFs
///
/// Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct PdfGenerator {
    context: Arc<RecipeContext>,
}

impl PdfGenerator {
    pub fn new(
        app_dir: &ApplicationDirectory,
        settings: RecipeSettings,
        driver: Arc<dyn RenderDriver>,
    ) -> Self {
        Self {
            context: Arc::new(RecipeContext {
                workdir_base: app_dir.path().to_path_buf(),
                settings,
                driver,
            }),
        }
    }

    /// Handle one request
    ///
    /// A malformed request id is reported as an invalid request under a
    /// freshly minted id, so the failure can still be correlated.
    pub async fn handle(
        &self,
        request: GeneratePdfRequest,
        cancel: CancellationToken,
    ) -> GeneratePdfResponse {
        let (request_id, parsed) = match request.request_id.as_deref() {
            None => (RequestId::new(), Ok(())),
            Some(raw) => match raw.parse::<RequestId>() {
                Ok(id) => (id, Ok(())),
                Err(e) => (RequestId::new(), Err(e)),
            },
        };

        let span = tracing::info_span!("job", request_id = %request_id);

        let outcome = self
            .generate(request_id, parsed, request.archive, cancel)
            .instrument(span)
            .await;

        GeneratePdfResponse {
            request_id,
            outcome,
        }
    }

    /// The recipe runs on its own task: dropping this future does not
    /// interrupt cleanup.
    async fn generate(
        &self,
        request_id: RequestId,
        parsed: Result<()>,
        fields: ArchiveFields,
        cancel: CancellationToken,
    ) -> Result<Binary> {
        parsed?;
        let archive = Archive::new(fields)?;

        tracing::info!(
            original_name = %archive.original_name(),
            mime_type = %archive.mime_type(),
            size = archive.size(),
            "Job accepted"
        );

        let recipe = GenerationRecipe::new(request_id, archive, self.context.clone(), cancel);

        tokio::spawn(recipe.run().in_current_span()).await?
    }
}
