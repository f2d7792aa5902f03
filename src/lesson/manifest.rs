//! Lesson manifest (`index.json`) model.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// One uploaded artifact in a lesson manifest.
///
/// Older index files may lack any of the known fields. A missing field is
/// left out again when the entry is written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Upload time, `YYYY-MM-DDTHH:MM:SS.sssZ`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    /// Project base name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Public shared link to the artifact.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub download_url: String,
    /// Fields written by other tools, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManifestEntry {
    /// New entry stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        download_url: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: now_timestamp(),
            name: name.into(),
            title: Some(title.into()),
            description: Some(description.into()),
            download_url: download_url.into(),
            extra: Map::new(),
        }
    }
}

/// Ordered list of entries, stored as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Vec<ManifestEntry>);

impl Manifest {
    /// Empty manifest (used when the index file does not exist yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored JSON array.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode as pretty JSON with two-space indentation.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Append an entry at the end.
    pub fn push(&mut self, entry: ManifestEntry) {
        self.0.push(entry);
    }

    /// Entries in order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.0
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ManifestEntry>> for Manifest {
    fn from(entries: Vec<ManifestEntry>) -> Self {
        Self(entries)
    }
}

/// Current UTC time with millisecond precision and a `Z` suffix.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_timestamp_format() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
        assert!(ts.ends_with('Z'));
        let parsed = DateTime::parse_from_rfc3339(&ts).unwrap();
        let age = Utc::now() - parsed.with_timezone(&Utc);
        assert!(age.num_seconds().abs() < 5);
    }

    #[test]
    fn test_entry_wire_format() {
        let mut entry = ManifestEntry::new("robot", "Robot", "Moves around", "https://x/s/1");
        entry.timestamp = "2024-05-01T10:00:00.000Z".to_string();

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "timestamp": "2024-05-01T10:00:00.000Z",
                "name": "robot",
                "title": "Robot",
                "description": "Moves around",
                "downloadUrl": "https://x/s/1"
            })
        );
    }

    #[test]
    fn test_parse_keeps_unknown_fields() {
        let json = br#"[{"timestamp":"t","name":"n","title":"T","description":"d","downloadUrl":"u","author":"kim"}]"#;
        let manifest = Manifest::from_json(json).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.entries()[0].extra["author"], "kim");

        let encoded: Value = serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(encoded[0]["author"], "kim");
    }

    #[test]
    fn test_parse_entry_with_missing_fields() {
        let json = br#"[{"timestamp":"t","name":"robot","title":"Robot","downloadUrl":"u"},{"name":"bare"}]"#;
        let manifest = Manifest::from_json(json).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries()[0].title.as_deref(), Some("Robot"));
        assert_eq!(manifest.entries()[0].description, None);
        assert_eq!(manifest.entries()[1].download_url, "");

        // Missing fields stay missing when written back
        let encoded: Value = serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(
            encoded,
            serde_json::json!([
                {"timestamp": "t", "name": "robot", "title": "Robot", "downloadUrl": "u"},
                {"name": "bare"}
            ])
        );
    }

    #[test]
    fn test_new_entry_keeps_empty_description() {
        let entry = ManifestEntry::new("a", "A", "", "u");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["description"], "");
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(Manifest::from_json(br#"{"entries": []}"#).is_err());
        assert!(Manifest::from_json(b"not json").is_err());
    }

    #[test]
    fn test_pretty_two_space_indent() {
        let mut manifest = Manifest::new();
        assert!(manifest.is_empty());
        assert_eq!(manifest.to_json().unwrap(), b"[]");

        manifest.push(ManifestEntry::new("a", "b", "c", "d"));
        let text = String::from_utf8(manifest.to_json().unwrap()).unwrap();
        assert!(text.starts_with("[\n  {\n    \"timestamp\""));
    }
}
