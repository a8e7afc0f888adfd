//! Manifest Module
//!
//! Reads the `manifest.xml` index shipped at the top of every uploaded
//! archive and decides whether an unpacked input tree can be rendered.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dita_pdf_server::manifest::{is_processable, Manifest, MANIFEST_FILE_NAME};
//!
//! if is_processable(&input_dir) {
//!     let manifest = Manifest::from_path(input_dir.join(MANIFEST_FILE_NAME))?;
//!     for item in manifest.items() {
//!         println!("{} -> {}", item.name, item.ditamap);
//!     }
//! }
//! ```

mod processable;
mod reader;
mod types;

pub use processable::is_processable;
pub use types::{Item, Manifest, ManifestError, MANIFEST_FILE_NAME};
