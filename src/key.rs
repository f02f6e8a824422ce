use serde::{Deserialize, Serialize};

/// An identifier or label: either an integer or a text value.
///
/// Used as the identifier of data elements and classification results, and
/// as the label type inside a classification mapping. Ordering places all
/// integers before all text values.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Int(i64),
    Text(String),
}

/// Identifier of a data element or classification result.
pub type Uid = Key;

/// Label inside a classification mapping.
pub type Label = Key;

impl Key {
    /// Derive a content identifier from raw bytes (BLAKE3, hex encoded).
    pub fn from_content(bytes: &[u8]) -> Self {
        Key::Text(blake3::hash(bytes).to_hex().to_string())
    }

    /// Stable single-line encoding used as a database key.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{v}"),
            Key::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value.into())
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}
