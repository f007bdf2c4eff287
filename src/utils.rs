//! Low-level decode primitives shared by all on-disc structures.
//!
//! Every structure in an ISO 9660 image is decoded from an in-memory buffer
//! (one descriptor sector, one extent window, one path table) through a
//! [`ByteCursor`]. Each read either consumes exactly the bytes it promises
//! and advances the cursor, or fails with [`Error::BufferUnderrun`] and
//! leaves the cursor where it was.
//!
//! ## Integer layouts
//! | Method | Layout |
//! |--------|--------|
//! | [`ByteCursor::lsb`] | little-endian, `len` bytes |
//! | [`ByteCursor::msb`] | big-endian, `len` bytes |
//! | [`ByteCursor::bbo`] | both byte orders: `len/2` bytes LE then `len/2` bytes BE, halves must agree |
//! | [`ByteCursor::be_u16`] / [`ByteCursor::be_u32`] | fixed-width big-endian words |

use crate::{Error, Result};

/// Sequential reader over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Start reading `buf` at index 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading `buf` at index `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Current read position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor forward by `n` bytes without reading them.
    ///
    /// Bounds are not checked here; the next read reports any underrun.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    /// Bytes left between the cursor and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Borrow `len` bytes at the cursor without consuming them.
    #[inline]
    fn peek(&self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::BufferUnderrun {
            offset: usize::MAX,
        })?;
        self.buf.get(self.pos..end).ok_or(Error::BufferUnderrun {
            offset: self.pos.max(self.buf.len()),
        })
    }

    /// Read one byte.
    #[inline]
    pub fn u8(&mut self) -> Result<u8> {
        let b = self.peek(1)?[0];
        self.pos += 1;
        Ok(b)
    }

    /// Read `len` raw bytes.
    #[inline]
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let b = self.peek(len)?;
        self.pos += len;
        Ok(b)
    }

    /// Read exactly `N` bytes into a fixed-size array.
    #[inline]
    pub fn bytesa<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// Read a `len`-byte little-endian unsigned integer.
    pub fn lsb(&mut self, len: usize) -> Result<u64> {
        check_width(len)?;
        let v = fold_le(self.peek(len)?);
        self.pos += len;
        Ok(v)
    }

    /// Read a `len`-byte big-endian unsigned integer.
    pub fn msb(&mut self, len: usize) -> Result<u64> {
        check_width(len)?;
        let v = fold_be(self.peek(len)?);
        self.pos += len;
        Ok(v)
    }

    /// Read a both-byte-order integer occupying `len` bytes in total.
    ///
    /// The first half is little-endian, the second half big-endian. On a
    /// mismatch the cursor does not move.
    pub fn bbo(&mut self, len: usize) -> Result<u64> {
        if len % 2 != 0 {
            return Err(Error::Parse("both-byte-order field has odd width"));
        }
        let half = len / 2;
        check_width(half)?;
        let raw = self.peek(len)?;
        let le = fold_le(&raw[..half]);
        let be = fold_be(&raw[half..]);
        if le != be {
            return Err(Error::BothByteOrderMismatch { le, be });
        }
        self.pos += len;
        Ok(le)
    }

    /// Read a big-endian `u16`.
    #[inline]
    pub fn be_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.bytesa::<2>()?))
    }

    /// Read a big-endian `u32`.
    #[inline]
    pub fn be_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.bytesa::<4>()?))
    }

    /// Read a fixed-width string of `len` bytes.
    ///
    /// With `joliet` set the bytes are decoded as UTF-16BE, otherwise one
    /// byte per character (invalid UTF-8 is replaced). No trimming is done.
    pub fn string(&mut self, len: usize, joliet: bool) -> Result<String> {
        let raw = self.bytes(len)?;
        Ok(decode_string(raw, joliet))
    }

    /// Read a fixed-width string and trim padding from both ends.
    pub fn trimmed(&mut self, len: usize, joliet: bool) -> Result<String> {
        let s = self.string(len, joliet)?;
        Ok(trim(&s).to_owned())
    }
}

fn check_width(len: usize) -> Result<()> {
    if len > 8 {
        return Err(Error::Parse("integer field wider than 64 bits"));
    }
    Ok(())
}

#[inline]
fn fold_le(b: &[u8]) -> u64 {
    b.iter().rev().fold(0, |acc, &x| (acc << 8) | x as u64)
}

#[inline]
fn fold_be(b: &[u8]) -> u64 {
    b.iter().fold(0, |acc, &x| (acc << 8) | x as u64)
}

/// Decode raw identifier bytes, as UTF-16BE when `joliet` is set.
pub(crate) fn decode_string(raw: &[u8], joliet: bool) -> String {
    if joliet {
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(raw).into_owned()
    }
}

/// Strip space, control and NUL padding from both ends.
pub(crate) fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\0')
}

/// Round `num` up to the next multiple of `align`.
///
/// Used to size whole-sector reads. An `align` of zero returns `num`.
pub fn align(num: u64, align: u64) -> u64 {
    if align == 0 {
        return num;
    }
    num.div_ceil(align) * align
}
