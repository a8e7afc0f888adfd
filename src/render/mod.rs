//! Render Module
//!
//! Drives the external DITA rendering tool: one process per topic map,
//! discrete argv entries, exit code 0 means success.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dita_pdf_server::render::{DitaRenderer, ProcessingRecipe, RenderDriver};
//!
//! let recipe = ProcessingRecipe::builder()
//!     .executable("/opt/dita-ot/bin/dita")
//!     .dita_map(input.join("flowers/flowers.ditamap"))
//!     .output_dir(&output)
//!     .tmp_dir(&tmp)
//!     .format("pdf")
//!     .build()?;
//!
//! DitaRenderer::new().execute(&recipe, &cancel).await?;
//! ```

mod driver;
mod error;
mod recipe;

pub use driver::{DitaRenderer, RenderDriver, STDERR_TAIL_BYTES};
pub use error::RenderError;
pub use recipe::{OutputFormat, ProcessingRecipe, ProcessingRecipeBuilder};
