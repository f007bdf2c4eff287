//! Path tables - a flat list of every directory in a volume.
//!
//! Each entry names one directory and the ordinal of its parent. Entries are
//! numbered from 1 in table order; entry 1 is the root, whose parent is
//! itself. Full paths are rebuilt by following parent ordinals back to the
//! root.
//!
//! ## Record layout
//! ```text
//! [0x00] Length of directory identifier (u8, 0 = end of table)
//! [0x01] Extended attribute length      (u8)
//! [0x02] Location of extent             (u32)
//! [0x06] Parent directory number        (u16)
//! [0x08] Directory identifier           (variable)
//!        Padding byte if the identifier length is odd
//! ```
//!
//! Multi-byte fields are big-endian in the type M table and little-endian
//! in the type L table.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::trace;

use crate::directory::{DirectoryRecord, load_extent};
use crate::utils::{ByteCursor, align};
use crate::{Error, Result};

/// Directory number of the root entry.
pub const ROOT_DIRECTORY: u16 = 1;

/// Most parent links followed while resolving one path.
///
/// A well-formed table never comes close; the bound only stops cycles in
/// corrupt tables.
pub const MAX_PATH_DEPTH: usize = 1000;

/// Bytes moved per read/write while extracting file content.
pub const COPY_CHUNK: usize = 1024;

/// Byte order of a path table's multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PathTableOrder {
    /// Type L table, little-endian.
    Little,
    /// Type M table, big-endian.
    Big,
}

/// One path table entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PathTableRecord {
    /// Position in the table, starting at 1 for the root.
    pub dir_num: u16,
    /// Declared identifier length in bytes.
    pub identifier_length: u8,
    /// Extended attribute record length.
    pub ext_attr_length: u8,
    /// Logical block of the directory's extent.
    pub location: u32,
    /// Directory number of the parent.
    pub parent: u16,
    /// Directory identifier, trimmed. Empty for the root.
    pub identifier: String,
    /// Directory records stored at `location`, loaded with the table.
    pub extent: Vec<DirectoryRecord>,
}

impl PathTableRecord {
    /// Decode one type M (big-endian) record at the cursor.
    ///
    /// Returns [`None`] at the end of the table. The directory number is
    /// left at 0 and the extent empty; [`PathTable::load`] fills both.
    pub fn decode(c: &mut ByteCursor<'_>, joliet: bool) -> Result<Option<Self>> {
        Self::decode_ordered(c, PathTableOrder::Big, joliet)
    }

    /// Decode one record with the given field byte order.
    pub fn decode_ordered(
        c: &mut ByteCursor<'_>,
        order: PathTableOrder,
        joliet: bool,
    ) -> Result<Option<Self>> {
        let mut r = c.clone();

        let identifier_length = r.u8()?;
        if identifier_length == 0 {
            return Ok(None);
        }
        let ext_attr_length = r.u8()?;
        let (location, parent) = match order {
            PathTableOrder::Big => (r.be_u32()?, r.be_u16()?),
            PathTableOrder::Little => (r.lsb(4)? as u32, r.lsb(2)? as u16),
        };
        let identifier = r.trimmed(identifier_length as usize, joliet)?;
        if identifier_length % 2 != 0 {
            r.advance(1);
        }

        *c = r;
        Ok(Some(Self {
            dir_num: 0,
            identifier_length,
            ext_attr_length,
            location,
            parent,
            identifier,
            extent: Vec::new(),
        }))
    }

    /// Whether this entry's parent is the root.
    pub fn is_root_child(&self) -> bool {
        self.parent == ROOT_DIRECTORY
    }

    /// Absolute path of this directory, with leading and trailing `/`.
    ///
    /// The root resolves to `/`. Fails with [`Error::MaxDepthExceeded`] after
    /// [`MAX_PATH_DEPTH`] parent links, which only happens on a cyclic table.
    pub fn full_path(&self, table: &PathTable) -> Result<String> {
        if self.parent == ROOT_DIRECTORY {
            if self.identifier.is_empty() {
                return Ok("/".to_owned());
            }
            return Ok(format!("/{}/", self.identifier));
        }

        let mut path = self.identifier.clone();
        let mut used = table.parent_of(self)?;
        let mut depth = 0;
        loop {
            depth += 1;
            if depth > MAX_PATH_DEPTH {
                return Err(Error::MaxDepthExceeded(MAX_PATH_DEPTH));
            }
            path = format!("{}/{path}", used.identifier);
            if used.parent == ROOT_DIRECTORY {
                break;
            }
            used = table.parent_of(used)?;
        }

        Ok(format!("/{path}/"))
    }
}

/// A loaded path table: directory number to record, in table order.
#[derive(Debug, Clone, Default)]
pub struct PathTable {
    records: BTreeMap<u16, PathTableRecord>,
}

impl PathTable {
    /// Read and decode the table at `location`, loading every directory's
    /// extent as it goes.
    ///
    /// `size` is the table's byte length from the volume descriptor; whole
    /// blocks covering it are read.
    pub fn load<R: Read + Seek>(
        r: &mut R,
        location: u32,
        size: u32,
        block_size: u32,
        order: PathTableOrder,
        joliet: bool,
    ) -> Result<Self> {
        r.seek(SeekFrom::Start(location as u64 * block_size as u64))?;
        let want = align(size as u64, block_size as u64);
        let mut bytes = Vec::with_capacity(want as usize);
        r.by_ref().take(want).read_to_end(&mut bytes)?;

        let mut c = ByteCursor::new(&bytes);
        let mut records = BTreeMap::new();
        let mut dir_num: u16 = 0;
        while c.remaining() > 0 {
            let Some(mut rec) = PathTableRecord::decode_ordered(&mut c, order, joliet)? else {
                break;
            };
            dir_num = dir_num
                .checked_add(1)
                .ok_or(Error::Parse("path table has more than 65535 directories"))?;
            rec.dir_num = dir_num;
            rec.extent = load_extent(r, block_size, rec.location, joliet)?;
            records.insert(dir_num, rec);
        }

        trace!("loaded {} path table records", records.len());
        Ok(Self { records })
    }

    /// Build a table from already-decoded records, numbering them from 1.
    pub fn from_records(records: impl IntoIterator<Item = PathTableRecord>) -> Self {
        let records = records
            .into_iter()
            .zip(1u16..)
            .map(|(mut rec, num)| {
                rec.dir_num = num;
                (num, rec)
            })
            .collect();
        Self { records }
    }

    /// Look up a directory by number.
    pub fn get(&self, dir_num: u16) -> Option<&PathTableRecord> {
        self.records.get(&dir_num)
    }

    /// Iterate records in directory-number order.
    pub fn iter(&self) -> impl Iterator<Item = &PathTableRecord> {
        self.records.values()
    }

    /// Number of directories in the table.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn parent_of(&self, rec: &PathTableRecord) -> Result<&PathTableRecord> {
        self.get(rec.parent).ok_or(Error::MissingParent(rec.parent))
    }
}

impl<'a> IntoIterator for &'a PathTable {
    type Item = &'a PathTableRecord;
    type IntoIter = std::collections::btree_map::Values<'a, u16, PathTableRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

/// Copy `length` bytes starting at block `location` into `sink`.
///
/// Data moves in [`COPY_CHUNK`]-sized pieces. Returns the byte count.
pub fn copy_content<R: Read + Seek, W: Write>(
    r: &mut R,
    block_size: u32,
    location: u32,
    length: u64,
    sink: &mut W,
) -> io::Result<u64> {
    r.seek(SeekFrom::Start(location as u64 * block_size as u64))?;

    let mut buf = [0u8; COPY_CHUNK];
    let mut remaining = length;
    while remaining > 0 {
        let n = remaining.min(COPY_CHUNK as u64) as usize;
        r.read_exact(&mut buf[..n])?;
        sink.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    sink.flush()?;
    Ok(length)
}

/// Write the file content at block `location` to a new file at
/// `destination`.
///
/// Any failure is reported as [`Error::Extract`] naming `destination`.
pub fn extract_content<R: Read + Seek>(
    r: &mut R,
    block_size: u32,
    location: u32,
    length: u64,
    destination: &Path,
) -> Result<u64> {
    let wrap = |source| Error::Extract {
        path: destination.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(destination).map_err(wrap)?);
    copy_content(r, block_size, location, length, &mut out).map_err(wrap)
}
