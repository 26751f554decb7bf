use axum::extract::Multipart;
use bytes::Bytes;

use super::error::AppError;

/// Name of the multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// A file received in one request. Nothing about it is trusted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied file name
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Read the `file` field out of a multipart body.
///
/// Other fields are skipped. Any content is accepted; the body is consumed
/// up to and including the file.
pub async fn receive(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;

        return Ok(UploadedFile {
            name,
            content_type,
            bytes,
        });
    }

    Err(AppError::MissingFile)
}
