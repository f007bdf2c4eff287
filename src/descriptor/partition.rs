//! Volume partition descriptor (type 3).
//!
//! ```text
//! [0x07] Unused                          (u8)
//! [0x08] System identifier               (32 bytes)
//! [0x28] Volume partition identifier     (32 bytes)
//! [0x48] Volume partition location       (u32 both-byte-order)
//! [0x50] Volume partition size           (u32 both-byte-order)
//! ```

use crate::Result;
use crate::utils::ByteCursor;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PartitionDescriptor {
    pub system_id: String,
    pub partition_id: String,
    /// First logical block of the partition.
    pub location: u32,
    /// Partition size in logical blocks.
    pub size: u32,
}

impl PartitionDescriptor {
    pub fn decode(c: &mut ByteCursor<'_>) -> Result<Self> {
        c.advance(1);
        Ok(Self {
            system_id: c.trimmed(32, false)?,
            partition_id: c.trimmed(32, false)?,
            location: c.bbo(8)? as u32,
            size: c.bbo(8)? as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Descriptor, DescriptorKind, SECTOR_SIZE};

    #[test]
    fn decode_partition() {
        let mut s = vec![0u8; SECTOR_SIZE];
        s[0] = 3;
        s[1..6].copy_from_slice(b"CD001");
        s[6] = 1;
        s[8..13].copy_from_slice(b"LINUX");
        s[40..44].copy_from_slice(b"PART");
        s[72..76].copy_from_slice(&100u32.to_le_bytes());
        s[76..80].copy_from_slice(&100u32.to_be_bytes());
        s[80..84].copy_from_slice(&8u32.to_le_bytes());
        s[84..88].copy_from_slice(&8u32.to_be_bytes());

        let d = Descriptor::decode(&s).unwrap();
        assert_eq!(d.kind, DescriptorKind::Partition);
        assert_eq!(d.name(), "Partition volume descriptor");
        let p = d.partition().unwrap();
        assert_eq!(p.system_id, "LINUX");
        assert_eq!(p.partition_id, "PART");
        assert_eq!((p.location, p.size), (100, 8));
    }
}
