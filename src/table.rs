//! Bucket table traversal and record decoding.
//!
//! `TableView` interprets a complete map image as a header, a bucket table,
//! and a payload of length-prefixed records. It borrows the image rather
//! than owning a mapping, so the same code path serves the mmap-backed
//! reader, the builder's self-check, and fuzz inputs held in plain vectors.
//!
//! Every field is decoded explicitly at its byte offset with little-endian
//! conversion on a bounds-checked subslice. Nothing here overlays structs
//! on the raw image: layout, padding, and endianness of the host are
//! irrelevant to the format. A pointer or length that escapes the file is
//! a `Corrupt` error, never a panic.

use crate::error::{MapError, Result};
use crate::format::{BucketLayout, Header, HEADER_SIZE};
use crate::hash::stable_hash;
use crate::probe::ProbeSequence;

/// One decoded bucket: empty, or pointer(s) into the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    Combined { record: u32 },
    Split { key: u32, value: u32 },
}

/// Borrowed view over a complete map image.
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    data: &'a [u8],
    layout: BucketLayout,
    bucket_count: u32,
}

impl<'a> TableView<'a> {
    /// Validates the header and bucket-table geometry of `data`.
    ///
    /// Accepts dirty images; the second value reports whether the dirty
    /// magic was present. Lookup itself never consults the sentinel — that
    /// is the handle's job, and keeping it out of here lets corrupt or
    /// mid-rewrite images still be examined.
    pub fn parse(data: &'a [u8], layout: BucketLayout) -> Result<(Self, bool)> {
        let (header, dirty) = Header::parse(data)?;
        let bucket_count = header.bucket_count();

        let table_end = HEADER_SIZE + bucket_count as usize * layout.bucket_size();
        if data.len() < table_end {
            return Err(MapError::Corrupt("bucket table extends past end of file"));
        }

        Ok((
            Self {
                data,
                layout,
                bucket_count,
            },
            dirty,
        ))
    }

    /// Builds a view from already-validated geometry.
    ///
    /// Used by the handle, which validated the header at open and must not
    /// trust it again afterwards: an in-place rewrite may have changed it.
    /// All reads stay bounds-checked against `data`, so stale geometry can
    /// produce `Corrupt`, never an out-of-bounds access.
    pub(crate) fn from_parts(data: &'a [u8], layout: BucketLayout, bucket_count: u32) -> Self {
        Self {
            data,
            layout,
            bucket_count,
        }
    }

    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    pub fn layout(&self) -> BucketLayout {
        self.layout
    }

    /// Offset of the first payload byte.
    pub fn payload_start(&self) -> usize {
        HEADER_SIZE + self.bucket_count as usize * self.layout.bucket_size()
    }

    /// Finds the value stored for `key`, probing exactly as the builder
    /// inserted.
    ///
    /// The returned slice borrows the image; a missing key is `Ok(None)`.
    /// The probe loop is bounded at `bucket_count` steps — a well-formed
    /// table terminates earlier on a match or an empty slot, so running
    /// the bound out means the table was not built by the probe recurrence
    /// this reader uses.
    pub fn lookup(&self, key: &[u8]) -> Result<Option<&'a [u8]>> {
        let hash = stable_hash(key);
        let bound = self.bucket_count as usize;

        for idx in ProbeSequence::new(hash, self.bucket_count).take(bound) {
            match self.slot(idx)? {
                Slot::Empty => return Ok(None),
                Slot::Combined { record } => {
                    let (stored_key, value) = self.combined_record(record)?;
                    if stored_key == key {
                        return Ok(Some(value));
                    }
                }
                Slot::Split {
                    key: key_ptr,
                    value: value_ptr,
                } => {
                    if self.record(key_ptr)? == key {
                        return Ok(Some(self.record(value_ptr)?));
                    }
                }
            }
        }

        Err(MapError::Corrupt(
            "probe sequence exhausted without reaching an empty bucket",
        ))
    }

    /// Decodes bucket `idx`; `None` when the slot is empty.
    ///
    /// Iteration support: walks slots in table order, independent of any
    /// hash.
    pub fn entry(&self, idx: u32) -> Result<Option<(&'a [u8], &'a [u8])>> {
        match self.slot(idx)? {
            Slot::Empty => Ok(None),
            Slot::Combined { record } => self.combined_record(record).map(Some),
            Slot::Split { key, value } => {
                Ok(Some((self.record(key)?, self.record(value)?)))
            }
        }
    }

    /// Number of occupied buckets, by full table scan.
    pub fn occupied(&self) -> Result<u32> {
        let mut count = 0;
        for idx in 0..self.bucket_count {
            if !matches!(self.slot(idx)?, Slot::Empty) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn slot(&self, idx: u32) -> Result<Slot> {
        let offset = HEADER_SIZE + idx as usize * self.layout.bucket_size();
        match self.layout {
            BucketLayout::Combined => {
                let record = self.read_u32(offset)?;
                if record == 0 {
                    Ok(Slot::Empty)
                } else {
                    Ok(Slot::Combined { record })
                }
            }
            BucketLayout::Split => {
                let key = self.read_u32(offset)?;
                let value = self.read_u32(offset + 4)?;
                match (key, value) {
                    (0, 0) => Ok(Slot::Empty),
                    (0, _) | (_, 0) => {
                        Err(MapError::Corrupt("split bucket with one null pointer"))
                    }
                    (key, value) => Ok(Slot::Split { key, value }),
                }
            }
        }
    }

    /// Combined record: `[key_len u16][value_len u16][key][value]`.
    fn combined_record(&self, ptr: u32) -> Result<(&'a [u8], &'a [u8])> {
        let start = ptr as usize;
        let key_len = self.read_u16(start)? as usize;
        let value_len = self.read_u16(start + 2)? as usize;

        let key_start = start + 4;
        let key = self.bytes_at(key_start, key_len)?;
        let value = self.bytes_at(key_start + key_len, value_len)?;
        Ok((key, value))
    }

    /// Standalone record: `[len u16][bytes]`.
    fn record(&self, ptr: u32) -> Result<&'a [u8]> {
        let start = ptr as usize;
        let len = self.read_u16(start)? as usize;
        self.bytes_at(start + 2, len)
    }

    fn bytes_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        self.data
            .get(offset..offset.checked_add(len).ok_or(OUT_OF_BOUNDS)?)
            .ok_or(OUT_OF_BOUNDS)
    }

    fn read_u16(&self, offset: usize) -> Result<u16> {
        let bytes = self.bytes_at(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&self, offset: usize) -> Result<u32> {
        let bytes = self.bytes_at(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

const OUT_OF_BOUNDS: MapError = MapError::Corrupt("record extends past end of file");
