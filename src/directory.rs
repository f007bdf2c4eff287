//! Directory records - one file or subdirectory reference.
//!
//! A directory's data area (its *extent*) is a packed sequence of directory
//! records. The first two are always the `.` (self) and `..` (parent)
//! entries. A record with a length byte of zero ends the sequence.
//!
//! ## Layout
//! ```text
//! [0x00] Length of directory record   (u8, 0 = no more records)
//! [0x01] Extended attribute length    (u8)
//! [0x02] Extent location              (u32 both-byte-order)
//! [0x0A] Data length                  (u32 both-byte-order)
//! [0x12] Recording date and time      (7-byte binary date)
//! [0x19] File flags                   (u8, see FileFlags)
//! [0x1A] File unit size               (u8)
//! [0x1B] Interleave gap size          (u8)
//! [0x1C] Volume sequence number       (u16 both-byte-order)
//! [0x20] Length of file identifier    (u8)
//! [0x21] File identifier              (variable)
//!        Padding / system use         (up to record length)
//! ```
//!
//! The identifiers `\x00` and `\x01` of length 1 denote `.` and `..`.

use std::io::{Read, Seek, SeekFrom};

use bitflags::bitflags;
use log::{trace, warn};

use crate::date::{IsoDateTime, read_date7};
use crate::utils::{ByteCursor, decode_string, trim};
use crate::{Error, Result};

/// Bytes read from a directory's location when loading its extent.
///
/// The window is fixed and not derived from the directory's data length.
pub const EXTENT_WINDOW: usize = 4096;

bitflags! {
    /// Directory record file flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct FileFlags: u8 {
        /// Existence need not be made known to the user.
        const HIDDEN = 0x01;
        /// The record identifies a directory.
        const DIRECTORY = 0x02;
        /// The file is an associated file.
        const ASSOCIATED = 0x04;
        /// Record format is given by the extended attribute record.
        const RECORD = 0x08;
        /// Owner/group and permissions are given by the extended attribute record.
        const PROTECTED = 0x10;
        /// This is not the final record for the file.
        const MULTI_EXTENT = 0x80;
    }
}

/// One decoded directory record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DirectoryRecord {
    /// Declared record length in bytes.
    pub length: u8,
    /// Extended attribute record length.
    pub ext_attr_length: u8,
    /// Logical block of the file's data (or of the directory's extent).
    pub location: u32,
    /// Data length in bytes.
    pub data_length: u32,
    /// Recording date, if set.
    pub recorded_at: Option<IsoDateTime>,
    /// File flags.
    pub flags: FileFlags,
    /// File unit size for interleaved files.
    pub file_unit_size: u8,
    /// Interleave gap size for interleaved files.
    pub interleave_gap: u8,
    /// Volume in the volume set that holds the extent.
    pub volume_seq: u16,
    /// Declared identifier length in bytes.
    pub identifier_length: u8,
    /// Identifier, trimmed, version suffix removed; `.` / `..` for the
    /// self and parent entries.
    pub identifier: String,
}

impl DirectoryRecord {
    /// Size of the fixed part of a record, up to and including the
    /// identifier length byte.
    pub const FIXED_LEN: usize = 33;

    /// Decode one record at the cursor.
    ///
    /// Returns [`None`] when the length byte is zero, leaving the cursor in
    /// place. Otherwise the cursor advances by the record's declared length,
    /// skipping any padding and system use bytes.
    pub fn decode(c: &mut ByteCursor<'_>, joliet: bool) -> Result<Option<Self>> {
        let mut r = c.clone();

        let length = r.u8()?;
        if length == 0 {
            return Ok(None);
        }

        let ext_attr_length = r.u8()?;
        let location = r.bbo(8)? as u32;
        let data_length = r.bbo(8)? as u32;
        let recorded_at = read_date7(&mut r)?;
        let flags = FileFlags::from_bits_retain(r.u8()?);
        let file_unit_size = r.u8()?;
        let interleave_gap = r.u8()?;
        let volume_seq = r.bbo(4)? as u16;
        let identifier_length = r.u8()?;

        if (length as usize) < Self::FIXED_LEN + identifier_length as usize {
            return Err(Error::Parse("directory record shorter than its identifier"));
        }

        let raw = r.bytes(identifier_length as usize)?;
        let identifier = match raw {
            [0x00] => ".".to_owned(),
            [0x01] => "..".to_owned(),
            _ => strip_version(trim(&decode_string(raw, joliet))).to_owned(),
        };

        c.advance(length as usize);

        Ok(Some(Self {
            length,
            ext_attr_length,
            location,
            data_length,
            recorded_at,
            flags,
            file_unit_size,
            interleave_gap,
            volume_seq,
            identifier_length,
            identifier,
        }))
    }

    /// Load the extent of this record's directory.
    pub fn load_extent<R: Read + Seek>(
        &self,
        r: &mut R,
        block_size: u32,
        joliet: bool,
    ) -> Result<Vec<DirectoryRecord>> {
        load_extent(r, block_size, self.location, joliet)
    }

    /// Whether the hidden flag is set.
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(FileFlags::HIDDEN)
    }

    /// Whether this record identifies a directory.
    pub fn is_directory(&self) -> bool {
        self.flags.contains(FileFlags::DIRECTORY)
    }

    /// Whether this record is an associated file.
    pub fn is_associated(&self) -> bool {
        self.flags.contains(FileFlags::ASSOCIATED)
    }

    /// Whether the file has a record format.
    pub fn is_record(&self) -> bool {
        self.flags.contains(FileFlags::RECORD)
    }

    /// Whether owner and permissions are specified.
    pub fn is_protected(&self) -> bool {
        self.flags.contains(FileFlags::PROTECTED)
    }

    /// Whether more records follow for this file.
    pub fn is_multi_extent(&self) -> bool {
        self.flags.contains(FileFlags::MULTI_EXTENT)
    }

    /// Whether this is the `.` entry.
    pub fn is_this(&self) -> bool {
        self.identifier_length == 1 && self.identifier == "."
    }

    /// Whether this is the `..` entry.
    pub fn is_parent(&self) -> bool {
        self.identifier_length == 1 && self.identifier == ".."
    }
}

/// Load the sequence of records stored at `location`.
///
/// Reads [`EXTENT_WINDOW`] bytes from `location * block_size` and decodes
/// records until the first zero-length record. Seek and read failures are
/// errors, as is a `location` at or past the end of the image. A directory
/// with no records is an empty `Vec`.
pub fn load_extent<R: Read + Seek>(
    r: &mut R,
    block_size: u32,
    location: u32,
    joliet: bool,
) -> Result<Vec<DirectoryRecord>> {
    let offset = location as u64 * block_size as u64;
    r.seek(SeekFrom::Start(offset))?;

    let mut window = Vec::with_capacity(EXTENT_WINDOW);
    r.by_ref().take(EXTENT_WINDOW as u64).read_to_end(&mut window)?;
    if window.is_empty() {
        return Err(Error::ExtentOutOfRange { location });
    }
    if window.len() < EXTENT_WINDOW {
        warn!(
            "extent at {offset:#x} truncated to {} bytes by end of image",
            window.len()
        );
    }

    let mut c = ByteCursor::new(&window);
    let mut records = Vec::new();
    while c.remaining() > 0 {
        match DirectoryRecord::decode(&mut c, joliet)? {
            Some(rec) => records.push(rec),
            None => break,
        }
    }

    trace!("loaded {} directory records at block {location}", records.len());
    Ok(records)
}

/// Remove a trailing `;<digits>` file version from an identifier.
fn strip_version(name: &str) -> &str {
    match name.rsplit_once(';') {
        Some((base, ver)) if !ver.is_empty() && ver.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => name,
    }
}
