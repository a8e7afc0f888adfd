//! Manifest parsing
//!
//! Deserializes `manifest.xml` with quick-xml and validates the structure
//! the pipeline relies on. Unknown elements and attributes are ignored.

use std::io::{BufRead, BufReader};
use std::path::{Component, Path};

use quick_xml::de::{from_reader, from_str};
use serde::Deserialize;

use super::types::{Item, Manifest, ManifestError};

impl Manifest {
    /// Parse a manifest from a buffered reader
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, ManifestError> {
        let raw: RawManifest = from_reader(reader)?;
        raw.validate()
    }

    /// Parse a manifest from an XML string
    pub fn parse_str(xml: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = from_str(xml)?;
        raw.validate()
    }

    /// Open and parse a manifest file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let file = std::fs::File::open(path)?;
        Self::parse(BufReader::new(file))
    }
}

// Manifest XML structures for deserialization

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(rename = "@version", default)]
    version: Option<String>,
    items: Option<RawItems>,
}

#[derive(Debug, Deserialize)]
struct RawItems {
    #[serde(rename = "item", default)]
    item: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(rename = "@name", default)]
    name: Option<String>,
    ditamap: Option<String>,
    files: Option<RawFiles>,
}

#[derive(Debug, Deserialize)]
struct RawFiles {
    #[serde(rename = "file", default)]
    file: Vec<String>,
}

impl RawManifest {
    fn validate(self) -> Result<Manifest, ManifestError> {
        let raw_items = self.items.ok_or(ManifestError::MissingItems)?.item;
        if raw_items.is_empty() {
            return Err(ManifestError::NoItem);
        }

        let mut items = Vec::with_capacity(raw_items.len());
        for (index, raw) in raw_items.into_iter().enumerate() {
            let name = raw.name.unwrap_or_default();

            let ditamap = raw
                .ditamap
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .ok_or_else(|| ManifestError::MissingDitamap {
                    index,
                    name: name.clone(),
                })?;

            if !is_relative_and_contained(&ditamap) {
                return Err(ManifestError::UnsafeDitamap {
                    index,
                    path: ditamap,
                });
            }

            let files = raw
                .files
                .map(|f| f.file.into_iter().map(|s| s.trim().to_string()).collect())
                .unwrap_or_default();

            items.push(Item {
                name,
                ditamap,
                files,
            });
        }

        Ok(Manifest {
            version: self.version,
            items,
        })
    }
}

fn is_relative_and_contained(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
