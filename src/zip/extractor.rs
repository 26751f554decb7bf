use bytes::Bytes;
use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::buffer::ZipArchiveBuffer;
use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all files in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Extract file data to memory, verifying its CRC-32.
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let data_offset = self.parser.get_data_offset(entry).await?;

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .await
            .with_context(|| format!("Failed to read data of {}", entry.file_name))?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(raw.as_slice())
                    .read_to_end(&mut out)
                    .with_context(|| format!("Failed to inflate {}", entry.file_name))?;
                out
            }
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {} for {}",
                    method,
                    entry.file_name
                );
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!("CRC-32 mismatch for {}", entry.file_name);
        }

        Ok(data)
    }

    /// Extract every file entry, keyed by name.
    pub async fn extract_all(&self) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut files = BTreeMap::new();
        for entry in self.list_files().await? {
            if entry.is_directory {
                continue;
            }
            let data = self.extract_to_memory(&entry).await?;
            files.insert(entry.file_name, data);
        }
        Ok(files)
    }
}

/// Read a packaged archive back into its name → text mapping.
///
/// This is the inverse of [`pack`](super::pack): every entry is
/// inflated, checked against its CRC-32 and decoded as UTF-8.
pub async fn unpack(archive: &ZipArchiveBuffer) -> Result<BTreeMap<String, String>> {
    unpack_bytes(archive.clone().into_bytes()).await
}

/// [`unpack`] for an archive received as raw bytes, e.g. an HTTP body.
pub async fn unpack_bytes(data: Bytes) -> Result<BTreeMap<String, String>> {
    let extractor = ZipExtractor::new(Arc::new(data));

    let mut entries = BTreeMap::new();
    for (name, data) in extractor.extract_all().await? {
        let text = String::from_utf8(data).with_context(|| format!("{name} is not UTF-8"))?;
        entries.insert(name, text);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::{PackError, ZipWriter, pack, pack_pairs};

    #[tokio::test]
    async fn pack_then_unpack_restores_the_mapping() {
        let entries = BTreeMap::from([
            (
                "AuditLog.csv".to_string(),
                "CreationDate,UserIds,Operations\n2023-01-01T00:00:00,alice@example.com,FileAccessed\n"
                    .to_string(),
            ),
            ("Exchange.csv".to_string(), "Id,Operation\n".repeat(200)),
            ("unicode/ünïcödé.csv".to_string(), "名前,値\n日本,東京\n".to_string()),
            ("empty.csv".to_string(), String::new()),
        ]);

        let archive = pack(&entries).unwrap();
        assert_eq!(unpack(&archive).await.unwrap(), entries);
    }

    #[tokio::test]
    async fn empty_archive_opens_with_no_entries() {
        let archive = pack(&BTreeMap::new()).unwrap();
        let extractor = ZipExtractor::new(Arc::new(archive.into_bytes()));
        assert!(extractor.list_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entry_metadata_is_listed_in_insertion_order() {
        let archive = pack_pairs([("b.csv", "2"), ("a.csv", "1")]).unwrap();
        let extractor = ZipExtractor::new(Arc::new(archive.into_bytes()));

        let names: Vec<_> = extractor
            .list_files()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.file_name)
            .collect();
        assert_eq!(names, ["b.csv", "a.csv"]);
    }

    #[tokio::test]
    async fn corrupted_data_fails_the_crc_check() {
        let mut writer = ZipWriter::new();
        writer.add_entry("a.txt", b"abc").unwrap();
        let mut bytes = writer.finish().unwrap().into_bytes().to_vec();

        // "abc" is stored right after the 30 byte header and 5 byte name
        bytes[35] = b'x';

        let err = unpack_bytes(Bytes::from(bytes)).await.unwrap_err();
        assert!(err.to_string().contains("CRC-32 mismatch"));
    }

    #[tokio::test]
    async fn garbage_is_not_an_archive() {
        assert!(unpack_bytes(Bytes::from_static(b"not a zip")).await.is_err());
        assert!(
            unpack_bytes(Bytes::from(vec![0u8; 100]))
                .await
                .unwrap_err()
                .to_string()
                .contains("Not a valid ZIP file")
        );
    }

    #[test]
    fn duplicate_check_happens_before_writing() {
        let mut writer = ZipWriter::new();
        writer.add_entry("a", b"1").unwrap();
        assert!(matches!(
            writer.add_entry("a", b"2"),
            Err(PackError::DuplicateEntry(_))
        ));
        assert_eq!(writer.len(), 1);
    }
}
