//! Boot record descriptor (type 0).
//!
//! ```text
//! [0x07] Boot system identifier  (32 bytes, e.g. "EL TORITO SPECIFICATION")
//! [0x27] Boot identifier         (32 bytes)
//! [0x47] Boot catalog location   (u32 LE, El Torito)
//! ```

use crate::Result;
use crate::utils::ByteCursor;

/// Boot record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BootRecord {
    pub boot_system_id: String,
    pub boot_id: String,
    /// Sector of the El Torito boot catalog.
    pub catalog_location: u32,
}

impl BootRecord {
    /// Decode the body; `c` sits just past the header.
    pub fn decode(c: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            boot_system_id: c.trimmed(32, false)?,
            boot_id: c.trimmed(32, false)?,
            catalog_location: c.lsb(4)? as u32,
        })
    }

    /// Whether this is an El Torito boot record.
    pub fn is_el_torito(&self) -> bool {
        self.boot_system_id == "EL TORITO SPECIFICATION"
    }
}
