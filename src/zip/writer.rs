//! In-memory ZIP archive writer.
//!
//! Entries are laid out front to back the way readers expect them:
//! each Local File Header is followed by its data, then the Central
//! Directory lists every entry, and the End of Central Directory record
//! closes the archive. Everything is written into one `Vec<u8>`; nothing
//! touches the filesystem.

use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use super::buffer::ZipArchiveBuffer;
use super::error::PackError;
use super::structures::*;

/// Streaming builder for an in-memory archive.
///
/// ## Example
///
/// ```
/// use auditzip::zip::ZipWriter;
///
/// let mut writer = ZipWriter::new();
/// writer.add_entry("AuditLog.csv", b"CreationDate,UserIds\n")?;
/// let archive = writer.finish()?;
/// assert!(archive.as_bytes().starts_with(b"PK\x03\x04"));
/// # Ok::<(), auditzip::zip::PackError>(())
/// ```
pub struct ZipWriter {
    buf: Vec<u8>,
    entries: Vec<EntryHeader>,
    names: HashSet<String>,
    modified: DosDateTime,
}

impl ZipWriter {
    /// Create a writer stamping entries with the current local time.
    pub fn new() -> Self {
        Self::with_modified(DosDateTime::now())
    }

    /// Create a writer stamping every entry with `modified`.
    pub fn with_modified(modified: DosDateTime) -> Self {
        Self {
            buf: Vec::new(),
            entries: Vec::new(),
            names: HashSet::new(),
            modified,
        }
    }

    /// Append one entry.
    ///
    /// The data is deflated unless that would not make it smaller, in
    /// which case it is stored as is.
    ///
    /// # Errors
    ///
    /// - [`PackError::InvalidEntryName`] if `name` is empty, absolute or
    ///   escapes the archive root
    /// - [`PackError::DuplicateEntry`] if `name` was already added
    /// - [`PackError::TooLarge`] if the entry or archive no longer fits
    ///   the 32-bit ZIP fields
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<(), PackError> {
        validate_entry_name(name)?;
        if self.names.contains(name) {
            return Err(PackError::DuplicateEntry(name.to_string()));
        }
        if self.entries.len() >= u16::MAX as usize {
            return Err(PackError::TooLarge("entry count"));
        }

        let uncompressed_size =
            u32::try_from(data.len()).map_err(|_| PackError::TooLarge("entry size"))?;
        let lfh_offset =
            u32::try_from(self.buf.len()).map_err(|_| PackError::TooLarge("archive size"))?;

        let mut crc = Crc::new();
        crc.update(data);

        let deflated = deflate(data)?;
        let (compression_method, payload) = if deflated.len() < data.len() {
            (CompressionMethod::Deflate, deflated.as_slice())
        } else {
            (CompressionMethod::Stored, data)
        };

        let compressed_size =
            u32::try_from(payload.len()).map_err(|_| PackError::TooLarge("entry size"))?;

        let header = EntryHeader {
            file_name: name.to_string(),
            compression_method,
            modified: self.modified,
            crc32: crc.sum(),
            compressed_size,
            uncompressed_size,
            lfh_offset,
        };

        header.write_local(&mut self.buf)?;
        self.buf.extend_from_slice(payload);

        self.names.insert(header.file_name.clone());
        self.entries.push(header);
        Ok(())
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the Central Directory and EOCD and return the closed archive.
    pub fn finish(mut self) -> Result<ZipArchiveBuffer, PackError> {
        let cd_offset =
            u32::try_from(self.buf.len()).map_err(|_| PackError::TooLarge("archive size"))?;

        for entry in &self.entries {
            entry.write_central(&mut self.buf)?;
        }

        let cd_size = u32::try_from(self.buf.len() - cd_offset as usize)
            .map_err(|_| PackError::TooLarge("central directory size"))?;

        EndOfCentralDirectory::new(self.entries.len() as u16, cd_size, cd_offset)
            .write_to(&mut self.buf)?;

        Ok(ZipArchiveBuffer::new(self.buf))
    }
}

impl Default for ZipWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Package a name → text mapping into a ZIP archive, one entry per key.
///
/// Keys of a map are unique, so this never fails with
/// [`PackError::DuplicateEntry`]; names are still validated.
pub fn pack(entries: &BTreeMap<String, String>) -> Result<ZipArchiveBuffer, PackError> {
    pack_pairs(entries)
}

/// Package ordered (name, text) pairs, rejecting repeated names.
pub fn pack_pairs<I, N, C>(pairs: I) -> Result<ZipArchiveBuffer, PackError>
where
    I: IntoIterator<Item = (N, C)>,
    N: AsRef<str>,
    C: AsRef<str>,
{
    let mut writer = ZipWriter::new();
    for (name, content) in pairs {
        writer.add_entry(name.as_ref(), content.as_ref().as_bytes())?;
    }
    writer.finish()
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Reject names an extractor could resolve outside its target directory.
pub fn validate_entry_name(name: &str) -> Result<(), PackError> {
    let invalid = |reason: &'static str| {
        Err(PackError::InvalidEntryName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("name is empty");
    }
    if name.len() > u16::MAX as usize {
        return invalid("name is longer than 65535 bytes");
    }
    if name.contains('\0') {
        return invalid("name contains a NUL byte");
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return invalid("name is an absolute path");
    }

    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return invalid("name starts with a drive prefix");
    }
    if name.ends_with('/') || name.ends_with('\\') {
        return invalid("name is a directory");
    }
    if name.split(['/', '\\']).any(|component| component == "..") {
        return invalid("name contains a parent directory reference");
    }

    Ok(())
}
