//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::job::PdfGenerator;
use crate::render::{DitaRenderer, RenderDriver};
use crate::workdir::{ApplicationDirectory, WorkdirError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    app_dir: ApplicationDirectory,
    generator: PdfGenerator,
}

impl AppState {
    /// Build the state around the configured renderer.
    ///
    /// The application directory is resolved but not created; see
    /// [`ApplicationDirectory::init`].
    pub fn new(config: Config) -> Result<Self, WorkdirError> {
        let driver = DitaRenderer::new()
            .with_java_home(config.renderer.java_home.clone())
            .with_timeout(config.renderer.timeout());

        Self::with_driver(config, Arc::new(driver))
    }

    /// Build the state around any render driver
    pub fn with_driver(config: Config, driver: Arc<dyn RenderDriver>) -> Result<Self, WorkdirError> {
        let app_dir = ApplicationDirectory::create(
            &config.app.name,
            config.fs.root_path.as_deref(),
            config.fs.use_native_temp,
        )?;

        let generator = PdfGenerator::new(&app_dir, config.renderer.recipe_settings(), driver);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                app_dir,
                generator,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the application directory
    pub fn app_dir(&self) -> &ApplicationDirectory {
        &self.inner.app_dir
    }

    /// Get the job entry point
    pub fn generator(&self) -> &PdfGenerator {
        &self.inner.generator
    }
}
