use bytes::Bytes;

/// A complete, closed ZIP archive held in memory.
///
/// The buffer is immutable once built and has no read cursor: every
/// consumer sees the archive from offset 0 to its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipArchiveBuffer {
    data: Bytes,
}

impl ZipArchiveBuffer {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Hand the archive over as a shared byte buffer.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for ZipArchiveBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
