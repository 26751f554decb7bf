//! # auditzip
//!
//! Upload an Office 365 audit log over HTTP and download the parsed CSV
//! files as a ZIP archive.
//!
//! A request flows through four stages:
//!
//! 1. [`server::receive`] pulls the `file` field out of the multipart body
//! 2. [`audit::decode`] and an [`audit::RecordProcessor`] turn the upload
//!    into named CSV documents
//! 3. [`zip::pack`] writes those documents into an in-memory archive
//! 4. [`server::stream`] sends the archive back as a file download
//!
//! On SIGINT or SIGTERM the server drains and [`lifecycle::Lifecycle`]
//! flushes buffered logs before the process exits with status 0.
//!
//! ## Features
//!
//! - In-memory ZIP packaging with DEFLATE, CRC-32 and UTF-8 names
//! - Entry name validation against path traversal
//! - Office 365 audit log parsing, one CSV per workload
//! - Text or JSON logs with per-request trace correlation
//!
//! ## Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use auditzip::zip::{pack, unpack};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let outputs = BTreeMap::from([(
//!         "AuditLog.csv".to_string(),
//!         "CreationDate,UserIds\n2023-01-01T00:00:00,alice@example.com\n".to_string(),
//!     )]);
//!
//!     let archive = pack(&outputs)?;
//!     assert_eq!(unpack(&archive).await?, outputs);
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod cli;
pub mod io;
pub mod lifecycle;
pub mod server;
pub mod telemetry;
pub mod zip;

pub use audit::{O365AuditParser, RecordProcessor};
pub use cli::{Cli, LogFormat, Mode};
pub use io::ReadAt;
pub use lifecycle::{Lifecycle, ShutdownSignal};
pub use server::{AppError, ServerConfig};
pub use zip::{PackError, ZipArchiveBuffer, ZipExtractor};
