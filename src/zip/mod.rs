//! ZIP archive packaging and inspection.
//!
//! ## Architecture
//!
//! - [`structures`]: ZIP records (EOCD, local and central headers) and how
//!   they are encoded and decoded
//! - [`writer`]: builds an archive in memory from named text entries
//! - [`parser`]: low-level parsing of an archive's Central Directory
//! - [`extractor`]: reads entries back out, used to verify packaging
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Supported Features
//!
//! - STORED and DEFLATE entries
//! - UTF-8 entry names (general purpose flag bit 11)
//!
//! ## Limitations
//!
//! - No ZIP64, so entries and archives are limited to 4 GiB and
//!   65535 entries
//! - No encryption, no multi-disk archives

mod buffer;
mod error;
mod extractor;
mod parser;
mod structures;
mod writer;

pub use buffer::ZipArchiveBuffer;
pub use error::PackError;
pub use extractor::{ZipExtractor, unpack, unpack_bytes};
pub use parser::ZipParser;
pub use structures::*;
pub use writer::{ZipWriter, pack, pack_pairs, validate_entry_name};
