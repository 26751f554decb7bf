use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use super::ReadAt;

/// In-memory archives are read straight out of the shared buffer.
#[async_trait]
impl ReadAt for Bytes {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = match usize::try_from(offset) {
            Ok(start) if start < self.len() => start,
            _ => return Ok(0),
        };

        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}
