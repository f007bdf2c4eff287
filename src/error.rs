//! Library-wide error and result types.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::descriptor::DescriptorKind;

/// Result alias used throughout isokit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Reaching the end of a directory record sequence, the end of a path table,
/// or a volume without a path table is not an error; those surface as
/// [`None`] or an empty collection.
#[derive(Debug)]
pub enum Error {
    /// An underlying seek or read against the image failed.
    Io(io::Error),
    /// Writing extracted content to `path` failed.
    Extract {
        /// Destination that was being written.
        path: PathBuf,
        /// The failing I/O operation.
        source: io::Error,
    },
    /// A decode needed a byte past the end of its buffer.
    BufferUnderrun {
        /// First index that was not present.
        offset: usize,
    },
    /// The little- and big-endian halves of a both-byte-order field differ.
    BothByteOrderMismatch {
        /// Value decoded from the little-endian half.
        le: u64,
        /// Value decoded from the big-endian half.
        be: u64,
    },
    /// A volume descriptor carried a type tag with no known variant.
    UnknownDescriptorType(u8),
    /// A volume descriptor's standard identifier is neither `CD001` nor a
    /// UDF bridge marker.
    UnknownIdentifier([u8; 5]),
    /// The same descriptor kind occurred twice in the descriptor set.
    DuplicateDescriptor(DescriptorKind),
    /// The image has no volume descriptor of the requested kind.
    MissingVolume(DescriptorKind),
    /// A directory extent starts at or past the end of the image.
    ExtentOutOfRange {
        /// Logical block the extent was expected at.
        location: u32,
    },
    /// Path resolution walked more parent links than allowed.
    MaxDepthExceeded(usize),
    /// A path table record names a parent directory number that is not in
    /// the table.
    MissingParent(u16),
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Extract { path, source } => {
                write!(f, "failed to extract to {}: {source}", path.display())
            }
            Error::BufferUnderrun { offset } => {
                write!(f, "failed to read buffer entry {offset}")
            }
            Error::BothByteOrderMismatch { le, be } => {
                write!(f, "both-byte-order mismatch: LE {le} != BE {be}")
            }
            Error::UnknownDescriptorType(t) => write!(f, "invalid descriptor type received: {t}"),
            Error::UnknownIdentifier(id) => {
                write!(f, "unknown standard identifier: {}", id.escape_ascii())
            }
            Error::DuplicateDescriptor(kind) => write!(f, "duplicate {kind}"),
            Error::MissingVolume(kind) => write!(f, "image has no {kind}"),
            Error::ExtentOutOfRange { location } => {
                write!(f, "directory extent at block {location} is past the end of the image")
            }
            Error::MaxDepthExceeded(depth) => write!(f, "maximum depth of {depth} reached"),
            Error::MissingParent(num) => write!(f, "path table has no directory number {num}"),
            Error::Parse(s) => write!(f, "parse error: {s}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) | Error::Extract { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
