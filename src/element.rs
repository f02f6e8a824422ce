use crate::{error::Result, key::Uid};

/// A unit of content tracked by a [`DataSet`](crate::DataSet).
///
/// Elements are produced by an ingestion layer outside this crate; data sets
/// only rely on this contract.
pub trait DataElement: Send + Sync {
    fn uuid(&self) -> &Uid;

    /// MIME type of the content, e.g. `text/plain`.
    fn content_type(&self) -> &str;

    fn get_bytes(&self) -> Result<Vec<u8>>;
}

impl std::fmt::Debug for dyn DataElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataElement")
            .field("uuid", self.uuid())
            .field("content_type", &self.content_type())
            .finish_non_exhaustive()
    }
}

/// A data element whose bytes live in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryElement {
    uuid: Uid,
    content_type: String,
    bytes: Vec<u8>,
}

impl MemoryElement {
    /// Create an element identified by the digest of its content.
    ///
    /// # Examples
    ///
    /// ```
    /// use reprkit::{DataElement, MemoryElement};
    ///
    /// let a = MemoryElement::new(b"hello".to_vec(), "text/plain");
    /// let b = MemoryElement::new(b"hello".to_vec(), "text/plain");
    /// assert_eq!(a.uuid(), b.uuid());
    /// ```
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            uuid: Uid::from_content(&bytes),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Create an element with an explicit identifier.
    pub fn with_uuid(
        uuid: impl Into<Uid>,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl DataElement for MemoryElement {
    fn uuid(&self) -> &Uid {
        &self.uuid
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn get_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_uuid_is_kept() {
        let elem = MemoryElement::with_uuid(7, b"x".to_vec(), "text/plain");
        assert_eq!(elem.uuid(), &Uid::Int(7));
        assert_eq!(elem.content_type(), "text/plain");
        assert_eq!(elem.get_bytes().unwrap(), b"x");
    }

    #[test]
    fn content_uuid_tracks_bytes() {
        let a = MemoryElement::new(b"one".to_vec(), "text/plain");
        let b = MemoryElement::new(b"two".to_vec(), "text/plain");
        assert_ne!(a.uuid(), b.uuid());
    }
}
