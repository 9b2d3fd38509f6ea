//! Archival metadata entry

use serde::{Deserialize, Serialize};

/// One catalogued file from the metadata file's `files` list
///
/// The label doubles as the image title. Extra keys in the source object
/// are ignored; a missing `description` reads as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl MetadataEntry {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            description: description.into(),
        }
    }

    /// True if this entry's label is exactly `title`
    pub fn matches(&self, title: &str) -> bool {
        self.label.as_deref() == Some(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_ignores_extra_keys() {
        let entry: MetadataEntry = serde_json::from_str(
            r#"{"label": "Plaza Mayor", "description": "Vista de la plaza", "id": 17, "format": "image/jpeg"}"#,
        )
        .unwrap();
        assert_eq!(entry, MetadataEntry::new("Plaza Mayor", "Vista de la plaza"));
    }

    #[test]
    fn test_missing_fields_are_tolerated() {
        let entry: MetadataEntry = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert!(entry.label.is_none());
        assert!(entry.description.is_empty());
        assert!(!entry.matches(""));
    }

    #[test]
    fn test_matches_is_exact() {
        let entry = MetadataEntry::new("Plaza Mayor", "");
        assert!(entry.matches("Plaza Mayor"));
        assert!(!entry.matches("plaza mayor"));
        assert!(!entry.matches("Plaza Mayor "));
    }
}
