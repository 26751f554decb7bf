use axum::{
    body::Body,
    http::{
        HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use super::error::AppError;

/// Send `body` as a file download named `file_name`.
///
/// The body goes out untouched with an exact `Content-Length`; empty
/// bodies are fine.
pub fn stream(body: Bytes, mime_type: &str, file_name: &str) -> Result<Response, AppError> {
    let content_type = HeaderValue::from_str(mime_type)
        .map_err(|_| AppError::Internal(format!("invalid MIME type {mime_type:?}")))?;
    let disposition = HeaderValue::from_str(&content_disposition(file_name))
        .map_err(|_| AppError::Internal(format!("invalid download file name {file_name:?}")))?;

    let headers = [
        (CONTENT_TYPE, content_type),
        (CONTENT_DISPOSITION, disposition),
        (CONTENT_LENGTH, HeaderValue::from(body.len())),
    ];

    Ok((headers, Body::from(body)).into_response())
}

fn content_disposition(file_name: &str) -> String {
    let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("attachment; filename=\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn download_headers_and_exact_body() {
        let response = stream(
            Bytes::from_static(b"PK\x05\x06"),
            "application/zip",
            "files.zip",
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "application/zip");
        assert_eq!(headers[CONTENT_DISPOSITION], "attachment; filename=\"files.zip\"");
        assert_eq!(headers[CONTENT_LENGTH], "4");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"PK\x05\x06");
    }

    #[tokio::test]
    async fn empty_body_is_allowed() {
        let response = stream(Bytes::new(), "text/plain", "empty.txt").unwrap();
        assert_eq!(response.headers()[CONTENT_LENGTH], "0");
    }

    #[test]
    fn quotes_in_file_names_are_escaped() {
        assert_eq!(
            content_disposition(r#"a"b\c.zip"#),
            r#"attachment; filename="a\"b\\c.zip""#
        );
    }

    #[test]
    fn control_characters_cannot_become_headers() {
        let err = stream(Bytes::new(), "text/plain", "a\nb").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
