//! Job Module
//!
//! One request in, one packaged result out. [`PdfGenerator::handle`] resolves
//! the request id, validates the upload and runs a [`GenerationRecipe`] on
//! its own task.

mod error;
mod handler;
mod recipe;
mod types;

pub use error::{JobError, Result};
pub use handler::PdfGenerator;
pub use recipe::{GenerationRecipe, RecipeContext, RecipeSettings, RecipeState};
pub use types::{
    Archive, ArchiveFields, Binary, GeneratePdfRequest, GeneratePdfResponse, RequestId,
    BINARY_MIME_TYPE,
};
