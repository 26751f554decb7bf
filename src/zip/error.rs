use thiserror::Error;

/// Errors raised while packaging entries into an archive.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("Invalid entry name {name:?}: {reason}")]
    InvalidEntryName { name: String, reason: &'static str },

    #[error("Duplicate entry name {0:?}")]
    DuplicateEntry(String),

    #[error("Archive too large: {0} exceeds the ZIP limit")]
    TooLarge(&'static str),

    #[error("Failed to write archive: {0}")]
    Io(#[from] std::io::Error),
}
