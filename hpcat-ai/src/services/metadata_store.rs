//! Archival metadata lookup
//!
//! Loaded once at startup from a JSON file in the legacy encoding:
//!
//! ```json
//! { "files": [ { "label": "Plaza Mayor", "description": "...", ... } ] }
//! ```
//!
//! Lookup is a linear scan by label, first match wins. The source file does
//! not guarantee unique labels and nothing here enforces it.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::models::MetadataEntry;

#[derive(Debug, Deserialize)]
struct MetadataFile {
    files: Vec<MetadataEntry>,
}

/// Read-only archival context, keyed by image title
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    entries: Vec<MetadataEntry>,
}

impl MetadataStore {
    pub fn new(entries: Vec<MetadataEntry>) -> Self {
        Self { entries }
    }

    /// Load the metadata file
    ///
    /// A missing file, undecodable JSON, or a missing `files` list is a
    /// configuration error.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = hpcat_common::encoding::read_legacy_file(path).map_err(|e| {
            CatalogError::Config(format!("Metadata file {}: {}", path.display(), e))
        })?;
        let store = Self::parse(&text).map_err(|e| {
            CatalogError::Config(format!("Metadata file {}: {}", path.display(), e))
        })?;

        info!(
            path = %path.display(),
            entries = store.len(),
            "Metadata store loaded"
        );
        Ok(store)
    }

    /// Parse metadata from JSON text
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Self::parse(text).map_err(|e| CatalogError::Config(format!("malformed metadata: {}", e)))
    }

    fn parse(text: &str) -> serde_json::Result<Self> {
        let file: MetadataFile = serde_json::from_str(text)?;
        Ok(Self::new(file.files))
    }

    /// First entry whose label equals `title`
    pub fn lookup(&self, title: &str) -> Option<&MetadataEntry> {
        let found = self.entries.iter().find(|entry| entry.matches(title));
        debug!(title, found = found.is_some(), "Metadata lookup");
        found
    }

    /// Archival context for `title`, empty when the title is unknown
    pub fn context_for(&self, title: &str) -> String {
        self.lookup(title)
            .map(|entry| entry.description.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
