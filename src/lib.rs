//! **isokit** - a Rust library for reading ISO 9660 disc images.
//!
//! Handles plain ISO 9660, Joliet (UTF-16 names via a supplementary
//! volume descriptor) and UDF bridge images, whose UDF recognition
//! sequence is detected but not decoded.
//!
//! # Modules
//! | Module | Structure |
//! |--------|-----------|
//! | [`descriptor`]  | Volume descriptor set - primary, supplementary, boot, partition, terminator, UDF markers |
//! | [`directory`]   | Directory records and directory extents |
//! | [`path_table`]  | L/M path tables, path resolution, content extraction |
//! | [`date`]        | 7-byte and 17-byte on-disc timestamps |
//! | [`image`]       | [`IsoImage`] - reader wrapper tying it together |
//! | [`utils`]       | Byte cursor and integer layouts |
//!
//! # Example
//! ```no_run
//! use isokit::IsoImage;
//!
//! let mut iso = IsoImage::open("disc.iso")?;
//! for (path, record) in iso.entries()? {
//!     println!("{path} {}", record.data_length);
//! }
//! # Ok::<(), isokit::Error>(())
//! ```

pub mod date;
pub mod descriptor;
pub mod directory;
pub mod error;
pub mod image;
pub mod path_table;
pub mod utils;

pub use descriptor::{Descriptor, DescriptorKind, DescriptorSet, VolumeDescriptor};
pub use directory::{DirectoryRecord, FileFlags};
pub use error::{Error, Result};
pub use image::IsoImage;
pub use path_table::{PathTable, PathTableRecord};
