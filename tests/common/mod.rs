//! Synthetic image builder shared by the integration tests.
//!
//! Produces a small but complete image:
//!
//! ```text
//! /HELLO.TXT           "Hello World.txt" on the Joliet side
//! /DOCS/               "Documents"
//! /DOCS/README.TXT     "Read Me.txt", spans two blocks
//! ```
#![allow(dead_code)]

use std::io::Cursor;

pub const BLOCK: usize = 2048;

pub const HELLO: &[u8] = b"Hello, ISO!\n";
pub const README_LEN: usize = 3000;

const PRIMARY_L_TABLE: u32 = 24;
const PRIMARY_M_TABLE: u32 = 25;
const JOLIET_L_TABLE: u32 = 26;
const JOLIET_M_TABLE: u32 = 27;
const PRIMARY_ROOT: u32 = 28;
const PRIMARY_DOCS: u32 = 29;
const JOLIET_ROOT: u32 = 30;
const JOLIET_DOCS: u32 = 31;
const HELLO_BLOCK: u32 = 32;
const README_BLOCK: u32 = 33;
const TOTAL_BLOCKS: usize = 35;

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Add a Joliet supplementary descriptor.
    pub joliet: bool,
    /// Append a UDF recognition sequence after the terminator.
    pub udf: bool,
    /// Write the primary descriptor twice.
    pub duplicate_primary: bool,
    /// Leave the M path table location unset.
    pub l_table_only: bool,
    /// Append a primary path table entry that is its own parent.
    pub cyclic_table: bool,
}

pub fn readme() -> Vec<u8> {
    (0..README_LEN).map(|i| (i % 251) as u8).collect()
}

pub fn image(opts: Options) -> Cursor<Vec<u8>> {
    Cursor::new(build(opts))
}

pub fn build(opts: Options) -> Vec<u8> {
    let mut img = vec![0u8; TOTAL_BLOCKS * BLOCK];

    let mut sectors = vec![volume(1, opts, false)];
    if opts.duplicate_primary {
        sectors.push(volume(1, opts, false));
    }
    if opts.joliet {
        sectors.push(volume(2, opts, true));
    }
    sectors.push(marker(255, b"CD001"));
    if opts.udf {
        sectors.push(marker(0, b"BEA01"));
        sectors.push(marker(0, b"NSR02"));
        sectors.push(marker(0, b"TEA01"));
    }
    assert!(sectors.len() <= 8, "descriptor area overlaps data");
    for (i, s) in sectors.iter().enumerate() {
        put(&mut img, 16 + i as u32, 0, s);
    }

    let mut primary_dirs = vec![(PRIMARY_ROOT, 1, &[0][..]), (PRIMARY_DOCS, 1, &b"DOCS"[..])];
    if opts.cyclic_table {
        primary_dirs.push((PRIMARY_DOCS, 3, &b"LOOP"[..]));
    }
    let primary_table = path_table(&primary_dirs);
    put(&mut img, PRIMARY_L_TABLE, 0, &primary_table.little);
    put(&mut img, PRIMARY_M_TABLE, 0, &primary_table.big);

    let documents = utf16("Documents");
    let joliet_table = path_table(&[(JOLIET_ROOT, 1, &[0][..]), (JOLIET_DOCS, 1, &documents[..])]);
    put(&mut img, JOLIET_L_TABLE, 0, &joliet_table.little);
    put(&mut img, JOLIET_M_TABLE, 0, &joliet_table.big);

    let readme_len = README_LEN as u32;
    let hello_len = HELLO.len() as u32;

    let mut root = dir_record(PRIMARY_ROOT, BLOCK as u32, 0x02, &[0]);
    root.extend(dir_record(PRIMARY_ROOT, BLOCK as u32, 0x02, &[1]));
    root.extend(dir_record(PRIMARY_DOCS, BLOCK as u32, 0x02, b"DOCS"));
    root.extend(dir_record(HELLO_BLOCK, hello_len, 0, b"HELLO.TXT;1"));
    put(&mut img, PRIMARY_ROOT, 0, &root);

    let mut docs = dir_record(PRIMARY_DOCS, BLOCK as u32, 0x02, &[0]);
    docs.extend(dir_record(PRIMARY_ROOT, BLOCK as u32, 0x02, &[1]));
    docs.extend(dir_record(README_BLOCK, readme_len, 0, b"README.TXT;1"));
    put(&mut img, PRIMARY_DOCS, 0, &docs);

    let mut root = dir_record(JOLIET_ROOT, BLOCK as u32, 0x02, &[0]);
    root.extend(dir_record(JOLIET_ROOT, BLOCK as u32, 0x02, &[1]));
    root.extend(dir_record(JOLIET_DOCS, BLOCK as u32, 0x02, &documents));
    root.extend(dir_record(HELLO_BLOCK, hello_len, 0, &utf16("Hello World.txt;1")));
    put(&mut img, JOLIET_ROOT, 0, &root);

    let mut docs = dir_record(JOLIET_DOCS, BLOCK as u32, 0x02, &[0]);
    docs.extend(dir_record(JOLIET_ROOT, BLOCK as u32, 0x02, &[1]));
    docs.extend(dir_record(README_BLOCK, readme_len, 0, &utf16("Read Me.txt;1")));
    put(&mut img, JOLIET_DOCS, 0, &docs);

    put(&mut img, HELLO_BLOCK, 0, HELLO);
    put(&mut img, README_BLOCK, 0, &readme());

    img
}

fn put(img: &mut [u8], block: u32, offset: usize, data: &[u8]) {
    let at = block as usize * BLOCK + offset;
    img[at..at + data.len()].copy_from_slice(data);
}

pub fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

pub fn marker(type_code: u8, id: &[u8; 5]) -> Vec<u8> {
    let mut s = vec![0u8; BLOCK];
    s[0] = type_code;
    s[1..6].copy_from_slice(id);
    s[6] = 1;
    s
}

pub fn dir_record(location: u32, size: u32, flags: u8, id: &[u8]) -> Vec<u8> {
    let mut len = 33 + id.len();
    if len % 2 != 0 {
        len += 1;
    }
    let mut out = vec![0u8; len];
    out[0] = len as u8;
    both32(&mut out[2..10], location);
    both32(&mut out[10..18], size);
    out[18..25].copy_from_slice(&[124, 6, 1, 8, 0, 0, 0]);
    out[25] = flags;
    both16(&mut out[28..32], 1);
    out[32] = id.len() as u8;
    out[33..33 + id.len()].copy_from_slice(id);
    out
}

pub struct PathTableBytes {
    pub little: Vec<u8>,
    pub big: Vec<u8>,
}

/// Encode `(location, parent, identifier)` entries as L and M tables.
pub fn path_table(entries: &[(u32, u16, &[u8])]) -> PathTableBytes {
    let mut little = Vec::new();
    let mut big = Vec::new();
    for &(location, parent, id) in entries {
        for (out, le) in [(&mut little, true), (&mut big, false)] {
            out.push(id.len() as u8);
            out.push(0);
            if le {
                out.extend(location.to_le_bytes());
                out.extend(parent.to_le_bytes());
            } else {
                out.extend(location.to_be_bytes());
                out.extend(parent.to_be_bytes());
            }
            out.extend_from_slice(id);
            if id.len() % 2 != 0 {
                out.push(0);
            }
        }
    }
    PathTableBytes { little, big }
}

fn both32(out: &mut [u8], v: u32) {
    out[..4].copy_from_slice(&v.to_le_bytes());
    out[4..8].copy_from_slice(&v.to_be_bytes());
}

fn both16(out: &mut [u8], v: u16) {
    out[..2].copy_from_slice(&v.to_le_bytes());
    out[2..4].copy_from_slice(&v.to_be_bytes());
}

fn padded(width: usize, text: &[u8], joliet: bool) -> Vec<u8> {
    let fill: &[u8] = if joliet { &[0x00, 0x20] } else { b" " };
    (0..width)
        .map(|i| text.get(i).copied().unwrap_or(fill[i % fill.len()]))
        .collect()
}

fn text(s: &str, joliet: bool) -> Vec<u8> {
    if joliet { utf16(s) } else { s.as_bytes().to_vec() }
}

fn volume(type_code: u8, opts: Options, joliet: bool) -> Vec<u8> {
    let mut s = vec![0u8; BLOCK];
    s[0] = type_code;
    s[1..6].copy_from_slice(b"CD001");
    s[6] = 1;
    s[8..40].copy_from_slice(&padded(32, &text("LINUX", joliet), joliet));
    s[40..72].copy_from_slice(&padded(32, &text("ISOKIT_TEST", joliet), joliet));
    both32(&mut s[80..88], TOTAL_BLOCKS as u32);
    if joliet {
        s[88..91].copy_from_slice(b"%/E");
    }
    both16(&mut s[120..124], 1);
    both16(&mut s[124..128], 1);
    both16(&mut s[128..132], BLOCK as u16);

    let (l, m, root, table_len) = if joliet {
        (JOLIET_L_TABLE, JOLIET_M_TABLE, JOLIET_ROOT, 10 + 8 + 18)
    } else {
        let cyclic = if opts.cyclic_table { 12 } else { 0 };
        (PRIMARY_L_TABLE, PRIMARY_M_TABLE, PRIMARY_ROOT, 10 + 12 + cyclic)
    };
    both32(&mut s[132..140], table_len);
    s[140..144].copy_from_slice(&l.to_le_bytes());
    let m = if opts.l_table_only { 0 } else { m };
    s[148..152].copy_from_slice(&m.to_be_bytes());
    s[156..190].copy_from_slice(&dir_record(root, BLOCK as u32, 0x02, &[0]));

    for (at, width) in [(190, 128), (318, 128), (446, 128), (574, 128)] {
        s[at..at + width].copy_from_slice(&padded(width, &[], joliet));
    }
    s[318..446].copy_from_slice(&padded(128, &text("ISOKIT", joliet), joliet));
    s[813..829].copy_from_slice(b"2024060108000000");
    s[830..846].copy_from_slice(b"2024060108000000");
    s[847..863].copy_from_slice(b"0000000000000000");
    s[864..880].copy_from_slice(b"0000000000000000");
    s[881] = 1;
    s
}

/// One primary volume whose path table holds only the root, and whose root
/// holds only `.` and `..`, then a terminator.
pub fn minimal() -> Cursor<Vec<u8>> {
    const TABLE: u32 = 18;
    const ROOT: u32 = 19;
    let mut img = vec![0u8; 20 * BLOCK];

    let mut pvd = volume(1, Options::default(), false);
    both32(&mut pvd[80..88], 20);
    both32(&mut pvd[132..140], 10);
    pvd[140..144].copy_from_slice(&0u32.to_le_bytes());
    pvd[148..152].copy_from_slice(&TABLE.to_be_bytes());
    pvd[156..190].copy_from_slice(&dir_record(ROOT, BLOCK as u32, 0x02, &[0]));
    put(&mut img, 16, 0, &pvd);
    put(&mut img, 17, 0, &marker(255, b"CD001"));

    put(&mut img, TABLE, 0, &path_table(&[(ROOT, 1, &[0][..])]).big);
    let mut root = dir_record(ROOT, BLOCK as u32, 0x02, &[0]);
    root.extend(dir_record(ROOT, BLOCK as u32, 0x02, &[1]));
    put(&mut img, ROOT, 0, &root);

    Cursor::new(img)
}
