//! Manifest types

/// Name of the manifest file at the top of the input directory
pub const MANIFEST_FILE_NAME: &str = "manifest.xml";

/// Parsed manifest: an ordered, non-empty list of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Value of the root `version` attribute, if any
    pub version: Option<String>,

    pub(crate) items: Vec<Item>,
}

impl Manifest {
    /// Items in document order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of items (never zero)
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a parsed manifest
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One entry point of the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Item name (empty when the attribute is absent)
    pub name: String,

    /// Topic map path, relative to the input directory
    pub ditamap: String,

    /// Referenced assets, informational only
    pub files: Vec<String>,
}

/// Manifest error types
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Malformed manifest: {0}")]
    Malformed(#[from] quick_xml::de::DeError),

    #[error("Manifest has no <items>")]
    MissingItems,

    #[error("Manifest has no <item>")]
    NoItem,

    #[error("Manifest item #{index} ({name}) has no <ditamap>")]
    MissingDitamap { index: usize, name: String },

    #[error("Manifest item #{index} ditamap '{path}' leaves the input directory")]
    UnsafeDitamap { index: usize, path: String },

    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
}
