//! Whole-image access.
//!
//! [`IsoImage`] owns a reader over an image, decodes the descriptor set on
//! open, and exposes the volume tree through the path table of the
//! preferred volume (Joliet when present, otherwise primary).

use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom, Take};
use std::path::{Component, Path};

use log::{debug, warn};

use crate::descriptor::{
    Descriptor, DescriptorKind, DescriptorSet, SECTOR_SIZE, VolumeDescriptor, read_descriptors,
};
use crate::directory::DirectoryRecord;
use crate::path_table::{PathTable, extract_content};
use crate::{Error, Result};

/// Reader wrapper around an ISO 9660 image.
pub struct IsoImage<R> {
    inner: R,
    descriptors: DescriptorSet,
}

impl IsoImage<BufReader<File>> {
    /// Open the image file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> IsoImage<R> {
    /// Read the descriptor set and wrap the provided reader.
    pub fn new(mut reader: R) -> Result<Self> {
        let descriptors = read_descriptors(&mut reader)?;
        debug!("read {} volume descriptors", descriptors.len());
        Ok(Self {
            inner: reader,
            descriptors,
        })
    }

    /// All decoded descriptors.
    pub fn descriptors(&self) -> &DescriptorSet {
        &self.descriptors
    }

    /// Primary volume descriptor, if present.
    pub fn primary(&self) -> Option<&VolumeDescriptor> {
        self.descriptors.primary()
    }

    /// Supplementary (Joliet) volume descriptor, if present.
    pub fn supplementary(&self) -> Option<&VolumeDescriptor> {
        self.descriptors.supplementary()
    }

    /// Volume used for tree access: supplementary when present, else primary.
    pub fn preferred_volume(&self) -> Option<&VolumeDescriptor> {
        self.supplementary().or_else(|| self.primary())
    }

    /// Kind of the volume used for tree access, if any.
    pub fn preferred_kind(&self) -> Option<DescriptorKind> {
        [DescriptorKind::SupplementaryVolume, DescriptorKind::PrimaryVolume]
            .into_iter()
            .find(|&kind| self.volume(kind).is_some())
    }

    /// Volume descriptor of `kind`, if the image has one.
    pub fn volume(&self, kind: DescriptorKind) -> Option<&VolumeDescriptor> {
        self.descriptors.get(kind).and_then(Descriptor::volume)
    }

    fn volume_and_reader(&mut self, kind: DescriptorKind) -> Result<(&VolumeDescriptor, &mut R)> {
        let Self { inner, descriptors } = self;
        let volume = descriptors
            .get(kind)
            .and_then(Descriptor::volume)
            .ok_or(Error::MissingVolume(kind))?;
        Ok((volume, inner))
    }

    /// Load the path table of the preferred volume.
    ///
    /// `None` when there is no volume descriptor or it records no table.
    pub fn path_table(&mut self) -> Result<Option<PathTable>> {
        match self.preferred_kind() {
            Some(kind) => {
                let (volume, r) = self.volume_and_reader(kind)?;
                volume.load_path_table(r)
            }
            None => Ok(None),
        }
    }

    /// Load the records of the directory `record` refers to.
    ///
    /// `volume` is the kind of the volume `record` was read from; its block
    /// size and string encoding apply.
    pub fn extent(
        &mut self,
        volume: DescriptorKind,
        record: &DirectoryRecord,
    ) -> Result<Vec<DirectoryRecord>> {
        let (volume, r) = self.volume_and_reader(volume)?;
        record.load_extent(r, block_size(volume), volume.is_joliet())
    }

    /// Open a file of `volume` for streaming access.
    ///
    /// Seeks to the file's first block and returns a [`Take`] limited to
    /// its data length. The borrow ends when the [`Take`] is dropped.
    pub fn read_file(
        &mut self,
        volume: DescriptorKind,
        record: &DirectoryRecord,
    ) -> Result<Take<&mut R>> {
        let (volume, r) = self.volume_and_reader(volume)?;
        let offset = record.location as u64 * block_size(volume) as u64;
        r.seek(SeekFrom::Start(offset))?;
        Ok(r.take(record.data_length as u64))
    }

    /// Copy the content of a file of `volume` to a new file at
    /// `destination`.
    pub fn extract_file(
        &mut self,
        volume: DescriptorKind,
        record: &DirectoryRecord,
        destination: &Path,
    ) -> Result<u64> {
        let (volume, r) = self.volume_and_reader(volume)?;
        extract_content(
            r,
            block_size(volume),
            record.location,
            record.data_length as u64,
            destination,
        )
    }

    /// List every file and directory below the root.
    ///
    /// Paths are absolute; directories end in `/`. Empty when the preferred
    /// volume has no path table.
    pub fn entries(&mut self) -> Result<Vec<(String, DirectoryRecord)>> {
        let Some(table) = self.path_table()? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for dir in &table {
            let base = match dir.full_path(&table) {
                Ok(base) => base,
                Err(e) => {
                    warn!("skipping directory {} ({:?}): {e}", dir.dir_num, dir.identifier);
                    continue;
                }
            };
            for rec in &dir.extent {
                if rec.is_this() || rec.is_parent() {
                    continue;
                }
                let mut path = format!("{base}{}", rec.identifier);
                if rec.is_directory() {
                    path.push('/');
                }
                entries.push((path, rec.clone()));
            }
        }
        Ok(entries)
    }

    /// Extract the whole tree under `destination`.
    ///
    /// Directories are created as needed. Entries whose names would escape
    /// `destination` are skipped. Returns the number of files written.
    pub fn extract_all(&mut self, destination: &Path) -> Result<usize> {
        let Some(kind) = self.preferred_kind() else {
            return Ok(0);
        };
        let mut files = 0;
        for (path, rec) in self.entries()? {
            let relative = Path::new(path.trim_start_matches('/'));
            if !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            {
                warn!("skipping unsafe path {path:?}");
                continue;
            }

            let target = destination.join(relative);
            if rec.is_directory() {
                fs::create_dir_all(&target).map_err(|source| Error::Extract {
                    path: target.clone(),
                    source,
                })?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| Error::Extract {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            debug!("extracting {path} ({} bytes)", rec.data_length);
            self.extract_file(kind, &rec, &target)?;
            files += 1;
        }
        Ok(files)
    }

    /// Consume the image, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Logical block size of `volume`, falling back to the sector size when
/// the descriptor records 0.
fn block_size(volume: &VolumeDescriptor) -> u32 {
    match volume.block_size {
        0 => SECTOR_SIZE as u32,
        n => n as u32,
    }
}
