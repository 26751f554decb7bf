use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    response::{Html, Response},
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::task;
use tracing::{Span, info};

use super::error::AppError;
use super::{AppState, response, upload};
use crate::audit::{self, RecordProcessor};
use crate::zip::{self, ZipArchiveBuffer};

pub const ARCHIVE_MIME: &str = "application/zip";
pub const ARCHIVE_FILE_NAME: &str = "files.zip";

pub const PLACEHOLDER_MIME: &str = "text/plain";
pub const PLACEHOLDER_FILE_NAME: &str = "file.txt";
pub const PLACEHOLDER_DATA: &[u8] = b"This is the file data";

const UPLOAD_FORM: &str = r#"<!doctype html>
<html>
  <body>
    <form action="/process_file" method="post" enctype="multipart/form-data">
      <input type="file" name="file">
      <input type="submit" value="Upload">
    </form>
  </body>
</html>
"#;

pub async fn hello() -> &'static str {
    info!(
        log_field = "custom-entry",
        arbitrary_field = "custom-entry",
        "custom fields"
    );
    info!("Child logger with trace Id.");

    "Hello, World!"
}

pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// Parse the uploaded audit log and answer with its CSV files zipped.
pub async fn process_archive(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let upload = upload::receive(multipart?).await?;
    info!(
        file_name = upload.name.as_deref().unwrap_or_default(),
        content_type = upload.content_type.as_deref().unwrap_or_default(),
        size = upload.bytes.len(),
        "received upload"
    );

    // Parsing and DEFLATE are CPU bound; keep them off the runtime workers.
    let processor = Arc::clone(&state.processor);
    let span = Span::current();
    let (entries, archive) = task::spawn_blocking(move || {
        span.in_scope(|| package(processor.as_ref(), &upload.bytes))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Packaging task failed: {e}")))??;
    info!(entries, size = archive.len(), "packaged archive");

    response::stream(archive.into_bytes(), ARCHIVE_MIME, ARCHIVE_FILE_NAME)
}

/// Decode an upload, run it through `processor` and zip the CSV outputs.
///
/// # Returns
///
/// The number of archive entries and the archive itself.
fn package(
    processor: &dyn RecordProcessor,
    bytes: &[u8],
) -> Result<(usize, ZipArchiveBuffer), AppError> {
    let text = audit::decode(bytes)?;
    let parsed = processor.process(&text)?;
    let outputs = processor.to_csv(&parsed)?;

    Ok((outputs.len(), zip::pack(&outputs)?))
}

/// Accept an upload and answer with a fixed text file.
pub async fn process_placeholder(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let upload = upload::receive(multipart?).await?;
    info!(
        file_name = upload.name.as_deref().unwrap_or_default(),
        size = upload.bytes.len(),
        "received upload"
    );

    response::stream(
        Bytes::from_static(PLACEHOLDER_DATA),
        PLACEHOLDER_MIME,
        PLACEHOLDER_FILE_NAME,
    )
}
