//! Sectioned map database and typed table views.
//!
//! # Layout
//!
//! A map file is a tree of named sections addressed by `"table/subsection"`
//! paths (`"point/data"`, `"shape/byline"`, …).  Each section is a row count
//! plus a byte buffer of fixed-stride little-endian records.  [`Table`] is a
//! zero-copy view over one section: rows are decoded on access, and the view
//! refuses to open if `size != count * stride`.
//!
//! Section buffers are [`Bytes`], so cloning a table into a context is a
//! reference-count bump, never a copy of the map data.

use std::marker::PhantomData;

use bytes::Bytes;
use rustc_hash::FxHashMap;

use crate::{MapError, MapResult};

// ── Section ───────────────────────────────────────────────────────────────────

/// One named section: `count` rows stored in `data`.
#[derive(Clone, Debug)]
pub struct Section {
    count: usize,
    data:  Bytes,
}

impl Section {
    pub fn new(count: usize, data: impl Into<Bytes>) -> Self {
        Self { count, data: data.into() }
    }

    /// Declared row count.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Size of the section in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

// ── MapDatabase ───────────────────────────────────────────────────────────────

/// In-memory stand-in for a mapped map file: a flat set of named sections.
#[derive(Clone, Debug, Default)]
pub struct MapDatabase {
    name:     String,
    sections: FxHashMap<String, Section>,
}

impl MapDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), sections: FxHashMap::default() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace the section at `path`.
    pub fn add_section(&mut self, path: impl Into<String>, section: Section) {
        self.sections.insert(path.into(), section);
    }

    /// Look up the section at `path`.
    pub fn get_subsection(&self, path: &str) -> MapResult<&Section> {
        self.sections
            .get(path)
            .ok_or_else(|| MapError::MissingSection(path.to_string()))
    }

    /// Section paths in sorted order.
    pub fn section_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// A fixed-stride row type stored in a section.
pub trait Record: Sized {
    /// Encoded size in bytes.
    const STRIDE: usize;

    /// Decode one row.  `bytes` is exactly `STRIDE` long.
    fn decode(bytes: &[u8]) -> Self;

    /// Append the encoded row to `out`.
    fn encode(&self, out: &mut Vec<u8>);
}

#[inline]
pub(crate) fn read_i32(b: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

#[inline]
pub(crate) fn read_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

#[inline]
pub(crate) fn read_i16(b: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([b[at], b[at + 1]])
}

impl Record for i32 {
    const STRIDE: usize = 4;
    fn decode(bytes: &[u8]) -> Self {
        read_i32(bytes, 0)
    }
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Record for u16 {
    const STRIDE: usize = 2;
    fn decode(bytes: &[u8]) -> Self {
        read_u16(bytes, 0)
    }
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// `(first, count)` row shared by every by-square index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawRange {
    pub first: i32,
    pub count: i32,
}

impl Record for RawRange {
    const STRIDE: usize = 8;
    fn decode(b: &[u8]) -> Self {
        Self { first: read_i32(b, 0), count: read_i32(b, 4) }
    }
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.first.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
    }
}

/// Encode a slice of records into a section.
pub fn encode_section<R: Record>(rows: &[R]) -> Section {
    let mut out = Vec::with_capacity(rows.len() * R::STRIDE);
    for row in rows {
        row.encode(&mut out);
    }
    Section::new(rows.len(), out)
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Typed, bounds-checked view over one section.
#[derive(Clone, Debug)]
pub struct Table<R: Record> {
    name:    &'static str,
    count:   usize,
    data:    Bytes,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> Table<R> {
    /// Open the section at `path`, checking its size against `R::STRIDE`.
    pub fn open(db: &MapDatabase, path: &'static str) -> MapResult<Self> {
        let section = db.get_subsection(path)?;
        if section.size() != section.count() * R::STRIDE {
            log::error!("invalid {path} structure in map {}", db.name());
            return Err(MapError::InvalidStructure {
                section: path.to_string(),
                size:    section.size(),
                count:   section.count(),
                stride:  R::STRIDE,
            });
        }
        Ok(Self {
            name:    path,
            count:   section.count(),
            data:    section.data().clone(),
            _marker: PhantomData,
        })
    }

    /// Like [`open`](Self::open) but also requires exactly `expected` rows.
    pub fn open_with_count(db: &MapDatabase, path: &'static str, expected: usize) -> MapResult<Self> {
        let table = Self::open(db, path)?;
        if table.count != expected {
            log::error!("invalid {path} count in map {}", db.name());
            return Err(MapError::CountMismatch {
                section: path.to_string(),
                expected,
                got: table.count,
            });
        }
        Ok(table)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Decode row `index`.
    #[inline]
    pub fn get(&self, index: usize) -> MapResult<R> {
        if index >= self.count {
            return Err(MapError::IndexOutOfRange {
                table: self.name,
                index: index as i64,
                count: self.count,
            });
        }
        let at = index * R::STRIDE;
        Ok(R::decode(&self.data[at..at + R::STRIDE]))
    }

    /// Iterate every row in order.
    pub fn iter(&self) -> impl Iterator<Item = R> + '_ {
        self.data.chunks_exact(R::STRIDE).map(R::decode)
    }
}
