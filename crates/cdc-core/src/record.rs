//! Change records and feed cursors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque position in a change feed.
///
/// A cursor identifies "all changes up to and including this point". Its
/// ordering belongs to the feed; the harness only stores and echoes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(id: impl Into<String>) -> Self {
        Cursor(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(id: &str) -> Self {
        Cursor(id.to_string())
    }
}

impl From<String> for Cursor {
    fn from(id: String) -> Self {
        Cursor(id)
    }
}

/// One change captured from the feed.
///
/// The event and metadata payloads are not interpreted by the harness. The
/// serialized size is computed once at construction and used for size
/// accounting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub id: Cursor,
    #[serde(rename = "txId")]
    pub tx_id: i64,
    pub seq: i64,
    pub event: serde_json::Value,
    pub metadata: serde_json::Value,
    #[serde(skip)]
    size_bytes: usize,
}

impl ChangeRecord {
    pub fn new(
        id: impl Into<Cursor>,
        tx_id: i64,
        seq: i64,
        event: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Self {
        let mut record = ChangeRecord {
            id: id.into(),
            tx_id,
            seq,
            event,
            metadata,
            size_bytes: 0,
        };
        record.size_bytes = serde_json::to_vec(&record)
            .map(|bytes| bytes.len())
            .unwrap_or_default();
        record
    }

    /// Serialized length of this record in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// The cursor this record advances the feed to.
    pub fn cursor(&self) -> &Cursor {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_size_matches_serialized_form() {
        let record = ChangeRecord::new("7", 3, 0, json!({"operation": "c"}), json!({}));
        let expected = r#"{"id":"7","txId":3,"seq":0,"event":{"operation":"c"},"metadata":{}}"#;
        assert_eq!(record.size_bytes(), expected.len());
    }

    #[test]
    fn test_size_grows_with_payload() {
        let small = ChangeRecord::new("1", 1, 0, json!({"p": "a"}), json!(null));
        let large = ChangeRecord::new("1", 1, 0, json!({"p": "aaaaaaaaaa"}), json!(null));
        assert_eq!(large.size_bytes() - small.size_bytes(), 9);
    }

    #[test]
    fn test_cursor_is_transparent() {
        let cursor = Cursor::from("A3f9");
        assert_eq!(serde_json::to_string(&cursor).unwrap(), "\"A3f9\"");
        assert_eq!(cursor.to_string(), "A3f9");
    }
}
