//! Primary and supplementary volume descriptors.
//!
//! Both share one layout. A supplementary descriptor whose escape sequences
//! name a UCS-2 level is a Joliet descriptor, and every string it references
//! (its own identifiers, path table and directory records) is UTF-16BE.
//!
//! ## Layout (offsets within the sector)
//! ```text
//! [0x000] Header (type, "CD001", version)
//! [0x007] Volume flags / unused               (u8)
//! [0x008] System identifier                   (32 bytes)
//! [0x028] Volume identifier                   (32 bytes)
//! [0x048] Unused                              (8 bytes)
//! [0x050] Volume space size                   (u32 both-byte-order)
//! [0x058] Escape sequences                    (32 bytes)
//! [0x078] Volume set size                     (u16 both-byte-order)
//! [0x07C] Volume sequence number              (u16 both-byte-order)
//! [0x080] Logical block size                  (u16 both-byte-order)
//! [0x084] Path table size                     (u32 both-byte-order)
//! [0x08C] L path table location               (u32 LE)
//! [0x090] Optional L path table location      (u32 LE)
//! [0x094] M path table location               (u32 BE)
//! [0x098] Optional M path table location      (u32 BE)
//! [0x09C] Root directory record               (34 bytes)
//! [0x0BE] Volume set identifier               (128 bytes)
//! [0x13E] Publisher identifier                (128 bytes)
//! [0x1BE] Data preparer identifier            (128 bytes)
//! [0x23E] Application identifier              (128 bytes)
//! [0x2BE] Copyright file identifier           (37 bytes)
//! [0x2E3] Abstract file identifier            (37 bytes)
//! [0x308] Bibliographic file identifier       (37 bytes)
//! [0x32D] Volume creation date                (17-byte date)
//! [0x33E] Volume modification date            (17-byte date)
//! [0x34F] Volume expiration date              (17-byte date)
//! [0x360] Volume effective date               (17-byte date)
//! [0x371] File structure version              (u8)
//! ```

use std::io::{Read, Seek};

use log::debug;

use crate::date::{IsoDateTime, read_date17};
use crate::directory::DirectoryRecord;
use crate::path_table::{PathTable, PathTableOrder};
use crate::utils::ByteCursor;
use crate::{Error, Result};

/// Joliet escape sequences, indexed by level - 1.
const JOLIET_ESCAPES: [&[u8; 3]; 3] = [b"%/@", b"%/C", b"%/E"];

/// Fields of a primary or supplementary volume descriptor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VolumeDescriptor {
    /// Decoded from a supplementary descriptor.
    pub supplementary: bool,
    /// Volume flags byte (unused in primary descriptors).
    pub volume_flags: u8,
    pub system_id: String,
    pub volume_id: String,
    /// Volume size in logical blocks.
    pub volume_space_size: u32,
    /// Raw escape sequence field.
    pub escape_sequences: [u8; 32],
    /// Joliet level 1-3, 0 when not Joliet.
    pub joliet_level: u8,
    pub volume_set_size: u16,
    pub volume_seq: u16,
    /// Logical block size in bytes, normally 2048.
    pub block_size: u16,
    /// Path table length in bytes.
    pub path_table_size: u32,
    pub l_path_table: u32,
    pub opt_l_path_table: u32,
    pub m_path_table: u32,
    pub opt_m_path_table: u32,
    /// Record for the root directory.
    pub root: DirectoryRecord,
    pub volume_set_id: String,
    pub publisher_id: String,
    pub preparer_id: String,
    pub application_id: String,
    pub copyright_file_id: String,
    pub abstract_file_id: String,
    pub bibliographic_file_id: String,
    pub created_at: Option<IsoDateTime>,
    pub modified_at: Option<IsoDateTime>,
    pub expires_at: Option<IsoDateTime>,
    pub effective_at: Option<IsoDateTime>,
    pub file_structure_version: u8,
}

impl VolumeDescriptor {
    /// Decode the body of a volume descriptor.
    ///
    /// `c` must sit just past the 7-byte header. Strings are decoded as
    /// UTF-16BE when `supplementary` is set.
    pub fn decode(c: &mut ByteCursor<'_>, supplementary: bool) -> Result<Self> {
        let joliet = supplementary;

        let volume_flags = c.u8()?;
        let system_id = c.trimmed(32, joliet)?;
        let volume_id = c.trimmed(32, joliet)?;
        c.advance(8);
        let volume_space_size = c.bbo(8)? as u32;
        let escape_sequences = c.bytesa::<32>()?;
        let volume_set_size = c.bbo(4)? as u16;
        let volume_seq = c.bbo(4)? as u16;
        let block_size = c.bbo(4)? as u16;
        let path_table_size = c.bbo(8)? as u32;
        let l_path_table = c.lsb(4)? as u32;
        let opt_l_path_table = c.lsb(4)? as u32;
        let m_path_table = c.msb(4)? as u32;
        let opt_m_path_table = c.msb(4)? as u32;

        let root = DirectoryRecord::decode(c, joliet)?
            .ok_or(Error::Parse("volume descriptor has no root directory record"))?;

        let volume_set_id = c.trimmed(128, joliet)?;
        let publisher_id = c.trimmed(128, joliet)?;
        let preparer_id = c.trimmed(128, joliet)?;
        let application_id = c.trimmed(128, joliet)?;
        let copyright_file_id = c.trimmed(37, joliet)?;
        let abstract_file_id = c.trimmed(37, joliet)?;
        let bibliographic_file_id = c.trimmed(37, joliet)?;

        let created_at = read_date17(c)?;
        let modified_at = read_date17(c)?;
        let expires_at = read_date17(c)?;
        let effective_at = read_date17(c)?;
        let file_structure_version = c.u8()?;

        let joliet_level = joliet_level(&escape_sequences, supplementary);
        debug!("volume {volume_id:?}: block size {block_size}, joliet level {joliet_level}");

        Ok(Self {
            supplementary,
            volume_flags,
            system_id,
            volume_id,
            volume_space_size,
            escape_sequences,
            joliet_level,
            volume_set_size,
            volume_seq,
            block_size,
            path_table_size,
            l_path_table,
            opt_l_path_table,
            m_path_table,
            opt_m_path_table,
            root,
            volume_set_id,
            publisher_id,
            preparer_id,
            application_id,
            copyright_file_id,
            abstract_file_id,
            bibliographic_file_id,
            created_at,
            modified_at,
            expires_at,
            effective_at,
            file_structure_version,
        })
    }

    /// Whether names on this volume are UTF-16BE.
    pub fn is_joliet(&self) -> bool {
        self.supplementary
    }

    /// Whether an L (little-endian) path table location is recorded.
    pub fn has_l_path_table(&self) -> bool {
        self.l_path_table != 0
    }

    /// Whether an M (big-endian) path table location is recorded.
    pub fn has_m_path_table(&self) -> bool {
        self.m_path_table != 0
    }

    /// Load the L path table, or `None` when none is recorded.
    pub fn load_l_path_table<R: Read + Seek>(&self, r: &mut R) -> Result<Option<PathTable>> {
        self.load_table(r, self.l_path_table, PathTableOrder::Little)
    }

    /// Load the M path table, or `None` when none is recorded.
    pub fn load_m_path_table<R: Read + Seek>(&self, r: &mut R) -> Result<Option<PathTable>> {
        self.load_table(r, self.m_path_table, PathTableOrder::Big)
    }

    /// Load the volume's path table, preferring the M table.
    ///
    /// Returns `None` when neither table location is recorded.
    pub fn load_path_table<R: Read + Seek>(&self, r: &mut R) -> Result<Option<PathTable>> {
        if self.has_m_path_table() {
            self.load_m_path_table(r)
        } else {
            self.load_l_path_table(r)
        }
    }

    fn load_table<R: Read + Seek>(
        &self,
        r: &mut R,
        location: u32,
        order: PathTableOrder,
    ) -> Result<Option<PathTable>> {
        if location == 0 || self.block_size == 0 {
            return Ok(None);
        }
        PathTable::load(
            r,
            location,
            self.path_table_size,
            self.block_size as u32,
            order,
            self.is_joliet(),
        )
        .map(Some)
    }
}

/// Joliet level named by `escape`, 0 for primary descriptors.
pub fn joliet_level(escape: &[u8], supplementary: bool) -> u8 {
    if !supplementary {
        return 0;
    }
    JOLIET_ESCAPES
        .iter()
        .position(|seq| escape.windows(3).any(|w| w == *seq))
        .map_or(0, |i| i as u8 + 1)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::descriptor::{Descriptor, DescriptorKind, SECTOR_SIZE};
    use crate::directory::tests::encode;

    fn put_bbo32(s: &mut [u8], at: usize, v: u32) {
        s[at..at + 4].copy_from_slice(&v.to_le_bytes());
        s[at + 4..at + 8].copy_from_slice(&v.to_be_bytes());
    }

    fn put_bbo16(s: &mut [u8], at: usize, v: u16) {
        s[at..at + 2].copy_from_slice(&v.to_le_bytes());
        s[at + 2..at + 4].copy_from_slice(&v.to_be_bytes());
    }

    fn put_str(s: &mut [u8], at: usize, width: usize, text: &str, joliet: bool) {
        let raw: Vec<u8> = if joliet {
            text.encode_utf16().flat_map(u16::to_be_bytes).collect()
        } else {
            text.bytes().collect()
        };
        let fill: &[u8] = if joliet { &[0x00, 0x20] } else { b" " };
        for (i, b) in s[at..at + width].iter_mut().enumerate() {
            *b = raw.get(i).copied().unwrap_or(fill[i % fill.len()]);
        }
    }

    fn sector(type_code: u8, escape: &[u8], joliet: bool) -> Vec<u8> {
        let mut s = vec![0u8; SECTOR_SIZE];
        s[0] = type_code;
        s[1..6].copy_from_slice(b"CD001");
        s[6] = 1;
        put_str(&mut s, 8, 32, "LINUX", joliet);
        put_str(&mut s, 40, 32, "TEST_VOL", joliet);
        put_bbo32(&mut s, 80, 64);
        s[88..88 + escape.len()].copy_from_slice(escape);
        put_bbo16(&mut s, 120, 1);
        put_bbo16(&mut s, 124, 1);
        put_bbo16(&mut s, 128, 2048);
        put_bbo32(&mut s, 132, 10);
        s[140..144].copy_from_slice(&19u32.to_le_bytes());
        s[148..152].copy_from_slice(&21u32.to_be_bytes());
        s[156..190].copy_from_slice(&encode(23, 2048, 0x02, &[0]));
        put_str(&mut s, 190, 128, "", joliet);
        put_str(&mut s, 318, 128, "PUBLISHER", joliet);
        put_str(&mut s, 446, 128, "", joliet);
        put_str(&mut s, 574, 128, "MKISOFS", joliet);
        s[813..829].copy_from_slice(b"2024030112000000");
        s[829] = 0;
        s[830..846].copy_from_slice(b"0000000000000000");
        s[881] = 1;
        s
    }

    #[test]
    fn decode_primary() {
        let raw = sector(1, &[], false);
        let d = Descriptor::decode(&raw).unwrap();
        assert_eq!(d.kind, DescriptorKind::PrimaryVolume);
        let v = d.volume().unwrap();
        assert!(!v.supplementary);
        assert_eq!(v.system_id, "LINUX");
        assert_eq!(v.volume_id, "TEST_VOL");
        assert_eq!(v.publisher_id, "PUBLISHER");
        assert_eq!(v.application_id, "MKISOFS");
        assert_eq!(v.volume_set_id, "");
        assert_eq!(v.volume_space_size, 64);
        assert_eq!(v.block_size, 2048);
        assert_eq!(v.path_table_size, 10);
        assert_eq!(v.l_path_table, 19);
        assert_eq!(v.m_path_table, 21);
        assert_eq!(v.root.location, 23);
        assert!(v.root.is_this());
        assert!(v.root.is_directory());
        assert_eq!(
            v.created_at.unwrap().to_rfc3339(),
            "2024-03-01T12:00:00+00:00"
        );
        assert!(v.modified_at.is_none());
        assert!(v.expires_at.is_none());
        assert_eq!(v.file_structure_version, 1);
        assert_eq!(v.joliet_level, 0);
    }

    #[test]
    fn primary_is_never_joliet() {
        let raw = sector(1, b"%/E", false);
        let d = Descriptor::decode(&raw).unwrap();
        assert_eq!(d.volume().unwrap().joliet_level, 0);
    }

    #[test]
    fn supplementary_joliet_levels() {
        let cases: [(&[u8], u8); 4] = [(b"%/@", 1), (b"%/C", 2), (b"%/E", 3), (b"", 0)];
        for (escape, level) in cases {
            let raw = sector(2, escape, true);
            let d = Descriptor::decode(&raw).unwrap();
            assert_eq!(d.kind, DescriptorKind::SupplementaryVolume);
            let v = d.volume().unwrap();
            assert_eq!(v.joliet_level, level);
            assert_eq!(v.volume_id, "TEST_VOL");
            assert_eq!(v.publisher_id, "PUBLISHER");
        }
    }

    #[test]
    fn path_table_choice() {
        let raw = sector(1, &[], false);
        let mut v = Descriptor::decode(&raw).unwrap().volume().unwrap().clone();
        assert!(v.has_l_path_table());
        assert!(v.has_m_path_table());

        v.l_path_table = 0;
        v.m_path_table = 0;
        let mut image = Cursor::new(vec![0u8; SECTOR_SIZE * 4]);
        assert!(v.load_path_table(&mut image).unwrap().is_none());

        v.m_path_table = 1;
        v.block_size = 0;
        assert!(v.load_path_table(&mut image).unwrap().is_none());
    }

    #[test]
    fn bad_block_size_is_rejected() {
        let mut raw = sector(1, &[], false);
        raw[131] = 0x01;
        assert!(matches!(
            Descriptor::decode(&raw),
            Err(Error::BothByteOrderMismatch { .. })
        ));
    }
}
