//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout pescore.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// A magic/signature field did not match the expected value.
    BadMagic,
    /// A format version is present in the data but not supported by this
    /// codec.
    UnsupportedVersion(String),
    /// The stream ended before all expected bytes could be read.
    UnexpectedEof,
    /// A null-terminated string had no null terminator within the buffer.
    UnterminatedName,
    /// An offset or size field would read outside the valid region.
    InvalidRange,
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
    /// CRILAYLA or zlib payload decompression failed.
    Decompress(&'static str),
    /// A checksum (e.g. an FPK entry's MD5) did not match its payload.
    ChecksumMismatch,
    /// A packed path or filename was written more than once.
    DuplicateEntry,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadMagic => write!(f, "bad magic value"),
            Error::UnsupportedVersion(v) => write!(f, "unsupported version: {v}"),
            Error::UnexpectedEof => write!(f, "unexpected end of file"),
            Error::UnterminatedName => write!(f, "unterminated string"),
            Error::InvalidRange => write!(f, "invalid offset or size"),
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Decompress(s) => write!(f, "decompression failed: {s}"),
            Error::ChecksumMismatch => write!(f, "checksum mismatch"),
            Error::DuplicateEntry => write!(f, "duplicate packed entry"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
