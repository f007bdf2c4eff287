//! Volume descriptor set - the sectors that describe an image.
//!
//! Descriptors start right after the 16-sector system area and occupy one
//! 2048-byte sector each. Every descriptor opens with the same header:
//!
//! ```text
//! [0x00] Type code            (u8)
//! [0x01] Standard identifier  (5 bytes, "CD001" or a UDF marker)
//! [0x06] Version              (u8)
//! ```
//!
//! ## Kinds
//! | Type | Identifier | Kind |
//! |------|------------|------|
//! | 0    | `CD001`    | [`DescriptorKind::Boot`] |
//! | 1    | `CD001`    | [`DescriptorKind::PrimaryVolume`] |
//! | 2    | `CD001`    | [`DescriptorKind::SupplementaryVolume`] |
//! | 3    | `CD001`    | [`DescriptorKind::Partition`] |
//! | 255  | `CD001`    | [`DescriptorKind::Terminator`] |
//! | 0    | `BEA01`    | [`DescriptorKind::UdfBea`] |
//! | 0    | `NSR02`    | [`DescriptorKind::UdfNsr2`] |
//! | 0    | `NSR03`    | [`DescriptorKind::UdfNsr3`] |
//! | 0    | `TEA01`    | [`DescriptorKind::UdfTea`] |
//!
//! ## Scanning
//! [`read_descriptors`] reads sectors until the set terminator. On a UDF
//! bridge image the UDF volume recognition sequence (`BEA01` .. `TEA01`)
//! follows the terminator; when the sector after the first terminator is a
//! UDF marker, scanning carries on until `TEA01` or a second terminator.
//! UDF descriptor bodies are not decoded.

pub mod boot;
pub mod partition;
pub mod volume;

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use log::debug;

pub use boot::BootRecord;
pub use partition::PartitionDescriptor;
pub use volume::VolumeDescriptor;

use crate::utils::ByteCursor;
use crate::{Error, Result};

/// Size of one descriptor sector.
pub const SECTOR_SIZE: usize = 2048;

/// Sectors reserved for the system area before the first descriptor.
pub const SYSTEM_AREA_SECTORS: u64 = 16;

/// Standard identifier of ISO 9660 descriptors.
pub const STANDARD_IDENTIFIER: &[u8; 5] = b"CD001";

/// Kind of a volume descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DescriptorKind {
    /// Boot record (type 0).
    Boot,
    /// Primary volume descriptor (type 1).
    PrimaryVolume,
    /// Supplementary volume descriptor (type 2), Joliet when escape
    /// sequences say so.
    SupplementaryVolume,
    /// Volume partition descriptor (type 3).
    Partition,
    /// Volume descriptor set terminator (type 255).
    Terminator,
    /// UDF beginning extended area marker.
    UdfBea,
    /// UDF NSR02 (UDF 1.x) marker.
    UdfNsr2,
    /// UDF NSR03 (UDF 2.x) marker.
    UdfNsr3,
    /// UDF terminating extended area marker.
    UdfTea,
}

impl DescriptorKind {
    /// Map a header's type code and standard identifier to a kind.
    pub fn classify(type_code: u8, identifier: &[u8; 5]) -> Result<Self> {
        let udf = match identifier {
            b"BEA01" => Some(Self::UdfBea),
            b"NSR02" => Some(Self::UdfNsr2),
            b"NSR03" => Some(Self::UdfNsr3),
            b"TEA01" => Some(Self::UdfTea),
            _ => None,
        };
        if let Some(kind) = udf {
            return match type_code {
                0 => Ok(kind),
                t => Err(Error::UnknownDescriptorType(t)),
            };
        }
        if identifier != STANDARD_IDENTIFIER {
            return Err(Error::UnknownIdentifier(*identifier));
        }
        match type_code {
            0 => Ok(Self::Boot),
            1 => Ok(Self::PrimaryVolume),
            2 => Ok(Self::SupplementaryVolume),
            3 => Ok(Self::Partition),
            255 => Ok(Self::Terminator),
            t => Err(Error::UnknownDescriptorType(t)),
        }
    }

    /// Whether this is one of the UDF recognition markers.
    pub fn is_udf(self) -> bool {
        matches!(
            self,
            Self::UdfBea | Self::UdfNsr2 | Self::UdfNsr3 | Self::UdfTea
        )
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boot => "Boot volume descriptor",
            Self::PrimaryVolume => "Primary volume descriptor",
            Self::SupplementaryVolume => "Supplementary volume descriptor",
            Self::Partition => "Partition volume descriptor",
            Self::Terminator => "Terminator descriptor",
            Self::UdfBea => "UDF BEA01 descriptor",
            Self::UdfNsr2 => "UDF NSR02 descriptor",
            Self::UdfNsr3 => "UDF NSR03 descriptor",
            Self::UdfTea => "UDF TEA descriptor",
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-specific part of a descriptor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DescriptorBody {
    /// Boot record fields.
    Boot(BootRecord),
    /// Primary or supplementary volume fields.
    Volume(Box<VolumeDescriptor>),
    /// Partition fields.
    Partition(PartitionDescriptor),
    /// Set terminator; no body.
    Terminator,
    /// UDF marker; body not decoded.
    Udf,
}

/// One decoded volume descriptor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Descriptor {
    /// Kind, from type code and identifier.
    pub kind: DescriptorKind,
    /// Standard identifier, e.g. `CD001`.
    pub standard_identifier: String,
    /// Descriptor version.
    pub version: u8,
    /// Kind-specific fields.
    pub body: DescriptorBody,
}

impl Descriptor {
    /// Decode a descriptor from one sector.
    pub fn decode(sector: &[u8]) -> Result<Self> {
        let mut c = ByteCursor::new(sector);
        let type_code = c.u8()?;
        let identifier = c.bytesa::<5>()?;
        let version = c.u8()?;

        let kind = DescriptorKind::classify(type_code, &identifier)?;
        let body = match kind {
            DescriptorKind::Boot => DescriptorBody::Boot(BootRecord::decode(&mut c)?),
            DescriptorKind::PrimaryVolume => {
                DescriptorBody::Volume(Box::new(VolumeDescriptor::decode(&mut c, false)?))
            }
            DescriptorKind::SupplementaryVolume => {
                DescriptorBody::Volume(Box::new(VolumeDescriptor::decode(&mut c, true)?))
            }
            DescriptorKind::Partition => {
                DescriptorBody::Partition(PartitionDescriptor::decode(&mut c)?)
            }
            DescriptorKind::Terminator => DescriptorBody::Terminator,
            DescriptorKind::UdfBea
            | DescriptorKind::UdfNsr2
            | DescriptorKind::UdfNsr3
            | DescriptorKind::UdfTea => DescriptorBody::Udf,
        };

        Ok(Self {
            kind,
            standard_identifier: String::from_utf8_lossy(&identifier).into_owned(),
            version,
            body,
        })
    }

    /// Human-readable name of the descriptor kind.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Volume fields, for primary and supplementary descriptors.
    pub fn volume(&self) -> Option<&VolumeDescriptor> {
        match &self.body {
            DescriptorBody::Volume(v) => Some(v.as_ref()),
            _ => None,
        }
    }

    /// Boot record fields.
    pub fn boot(&self) -> Option<&BootRecord> {
        match &self.body {
            DescriptorBody::Boot(b) => Some(b),
            _ => None,
        }
    }

    /// Partition fields.
    pub fn partition(&self) -> Option<&PartitionDescriptor> {
        match &self.body {
            DescriptorBody::Partition(p) => Some(p),
            _ => None,
        }
    }
}

/// Decoded descriptors, at most one per kind, in image order.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    descriptors: Vec<Descriptor>,
}

impl DescriptorSet {
    /// Add a descriptor; a second descriptor of the same kind is an error.
    pub fn insert(&mut self, descriptor: Descriptor) -> Result<()> {
        if self.contains(descriptor.kind) {
            return Err(Error::DuplicateDescriptor(descriptor.kind));
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Add a descriptor unless its kind is already present.
    fn insert_first(&mut self, descriptor: Descriptor) {
        if !self.contains(descriptor.kind) {
            self.descriptors.push(descriptor);
        }
    }

    /// Whether a descriptor of `kind` is present.
    pub fn contains(&self, kind: DescriptorKind) -> bool {
        self.descriptors.iter().any(|d| d.kind == kind)
    }

    /// Descriptor of `kind`, if present.
    pub fn get(&self, kind: DescriptorKind) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.kind == kind)
    }

    /// Primary volume descriptor, if present.
    pub fn primary(&self) -> Option<&VolumeDescriptor> {
        self.get(DescriptorKind::PrimaryVolume)
            .and_then(Descriptor::volume)
    }

    /// Supplementary volume descriptor, if present.
    pub fn supplementary(&self) -> Option<&VolumeDescriptor> {
        self.get(DescriptorKind::SupplementaryVolume)
            .and_then(Descriptor::volume)
    }

    /// Boot record, if present.
    pub fn boot(&self) -> Option<&BootRecord> {
        self.get(DescriptorKind::Boot).and_then(Descriptor::boot)
    }

    /// Iterate descriptors in the order they were read.
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no descriptors were read.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl<'a> IntoIterator for &'a DescriptorSet {
    type Item = &'a Descriptor;
    type IntoIter = std::slice::Iter<'a, Descriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

/// Read the volume descriptor set of an image.
///
/// Starts at sector [`SYSTEM_AREA_SECTORS`] and reads one sector at a time
/// until the set terminator (and, on UDF bridge images, the end of the UDF
/// recognition sequence). Running off the end of the image before a
/// terminator is an I/O error.
pub fn read_descriptors<R: Read + Seek>(r: &mut R) -> Result<DescriptorSet> {
    r.seek(SeekFrom::Start(SYSTEM_AREA_SECTORS * SECTOR_SIZE as u64))?;

    let mut set = DescriptorSet::default();
    let mut sector = [0u8; SECTOR_SIZE];
    let mut index = SYSTEM_AREA_SECTORS;
    let mut terminated = false;
    let mut bridge_open = false;

    loop {
        r.read_exact(&mut sector)?;
        let descriptor = Descriptor::decode(&sector)?;
        let kind = descriptor.kind;
        debug!("sector {index}: {kind}");
        index += 1;

        match kind {
            DescriptorKind::Terminator => {
                if terminated {
                    break;
                }
                set.insert(descriptor)?;
                terminated = true;
                if bridge_open {
                    continue;
                }
                if !next_is_udf(r)? {
                    break;
                }
                debug!("UDF bridge continues after sector {}", index - 1);
            }
            DescriptorKind::UdfTea => {
                set.insert_first(descriptor);
                bridge_open = false;
                if terminated {
                    break;
                }
            }
            k if k.is_udf() => {
                set.insert_first(descriptor);
                bridge_open = true;
            }
            _ => set.insert(descriptor)?,
        }
    }

    Ok(set)
}

/// Peek at the next sector header for a UDF marker without consuming it.
fn next_is_udf<R: Read + Seek>(r: &mut R) -> Result<bool> {
    let pos = r.stream_position()?;
    let mut header = [0u8; 6];
    match r.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(false),
        Err(e) => return Err(e.into()),
    }
    r.seek(SeekFrom::Start(pos))?;

    let mut identifier = [0u8; 5];
    identifier.copy_from_slice(&header[1..6]);
    Ok(DescriptorKind::classify(header[0], &identifier).is_ok_and(DescriptorKind::is_udf))
}
