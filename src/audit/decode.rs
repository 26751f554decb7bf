use thiserror::Error;

/// Uploaded bytes could not be decoded as text.
#[derive(Error, Debug)]
#[error("Upload is not valid {codec}: {detail}")]
pub struct EncodingError {
    /// The codec the bytes were decoded with.
    pub codec: &'static str,
    detail: String,
}

/// Decode an uploaded file as text.
///
/// A byte order mark selects UTF-16 (either endianness) and is dropped;
/// a UTF-8 BOM, as written by the audit log export, is dropped as well.
/// Everything else must be strict UTF-8.
pub fn decode(bytes: &[u8]) -> Result<String, EncodingError> {
    if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        return utf8(rest);
    }
    if let Some(rest) = bytes.strip_prefix(b"\xFF\xFE") {
        return utf16(rest, "utf-16le", u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(b"\xFE\xFF") {
        return utf16(rest, "utf-16be", u16::from_be_bytes);
    }
    utf8(bytes)
}

fn utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| EncodingError {
            codec: "utf-8",
            detail: e.to_string(),
        })
}

fn utf16(
    bytes: &[u8],
    codec: &'static str,
    unit: fn([u8; 2]) -> u16,
) -> Result<String, EncodingError> {
    if bytes.len() % 2 != 0 {
        return Err(EncodingError {
            codec,
            detail: format!("odd length of {} bytes", bytes.len()),
        });
    }

    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]])).collect();
    String::from_utf16(&units).map_err(|e| EncodingError {
        codec,
        detail: e.to_string(),
    })
}
