//! On-disk format: header layout, magic tags, bucket geometry.
//!
//! A map file is a header, a bucket table, and a payload region:
//!
//! ```text
//! +--------------------------------------+
//! | magic (4B)  "LEDA" / "LEDD"          |
//! | bucket_count (4B, LE u32, pow2)      |
//! +--------------------------------------+
//! | bucket table                         |
//! |   bucket_count x 4B  (combined)      |
//! |   bucket_count x 8B  (split)         |
//! +--------------------------------------+
//! | payload: length-prefixed records     |
//! |   addressed by absolute u32 offsets  |
//! +--------------------------------------+
//! ```
//!
//! Byte 3 of the magic is the dirty sentinel: `A` means the file is stable,
//! `D` means a builder is rewriting it in place. A bucket holding offset 0
//! is empty; the header guarantees no record can start there.
//!
//! The header carries no version field, so the two bucket layouts cannot be
//! told apart from the file alone; callers select one explicitly and
//! combined is the canonical default.

use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{MapError, Result};

pub const CLEAN_MAGIC: &[u8; 4] = b"LEDA";
pub const DIRTY_MAGIC: &[u8; 4] = b"LEDD";

/// Offset of the clean/dirty sentinel byte within the file.
pub const SENTINEL_OFFSET: usize = 3;
pub const CLEAN_SENTINEL: u8 = b'A';
pub const DIRTY_SENTINEL: u8 = b'D';

pub const HEADER_SIZE: usize = 8;

/// Record length fields are u16, so no key or value may exceed this.
pub const MAX_RECORD_LEN: usize = u16::MAX as usize;

/// Builders pad the file with zeros to this boundary.
pub const PAGE_ALIGN: usize = 4096;

/// Bucket table layout variant.
///
/// `Combined` is canonical: each bucket is one u32 pointer to a record
/// holding both lengths up front and key then value bytes behind them.
/// `Split` is the legacy variant with two u32 pointers per bucket, one to
/// an independently length-prefixed key record and one to a value record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BucketLayout {
    #[default]
    Combined,
    Split,
}

impl BucketLayout {
    pub const fn bucket_size(self) -> usize {
        match self {
            BucketLayout::Combined => 4,
            BucketLayout::Split => 8,
        }
    }
}

/// The 8-byte file header, decoded in place from unaligned mapped bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Header {
    magic: [u8; 4],
    bucket_count: U32,
}

const _: () = assert!(std::mem::size_of::<Header>() == HEADER_SIZE);

impl Header {
    /// Decodes and validates the header at the start of `data`.
    ///
    /// Both the clean and the dirty magic are accepted: dirtiness is a
    /// per-lookup concern, not an open-time error. Returns the header and
    /// whether the dirty tag was present.
    pub fn parse(data: &[u8]) -> Result<(Header, bool)> {
        let bytes = data
            .get(..HEADER_SIZE)
            .ok_or(MapError::Corrupt("file shorter than the 8-byte header"))?;
        let header = Header::read_from_bytes(bytes)
            .map_err(|_| MapError::Corrupt("file shorter than the 8-byte header"))?;

        let dirty = match &header.magic {
            m if m == CLEAN_MAGIC => false,
            m if m == DIRTY_MAGIC => true,
            m => return Err(MapError::BadMagic { found: *m }),
        };

        let count = header.bucket_count.get();
        if count == 0 || !count.is_power_of_two() {
            return Err(MapError::Corrupt("bucket count is not a power of two"));
        }

        Ok((header, dirty))
    }

    pub fn new(bucket_count: u32) -> Self {
        Self {
            magic: *CLEAN_MAGIC,
            bucket_count: U32::new(bucket_count),
        }
    }

    pub fn bucket_count(&self) -> u32 {
        self.bucket_count.get()
    }

    /// Byte offset where the payload region begins for `layout`.
    pub fn payload_start(&self, layout: BucketLayout) -> usize {
        HEADER_SIZE + self.bucket_count.get() as usize * layout.bucket_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(magic: &[u8; 4], count: u32) -> Vec<u8> {
        let mut bytes = magic.to_vec();
        bytes.extend_from_slice(&count.to_le_bytes());
        bytes
    }

    #[test]
    fn parses_clean_header() {
        let bytes = header_bytes(CLEAN_MAGIC, 16);
        let (header, dirty) = Header::parse(&bytes).unwrap();
        assert_eq!(header.bucket_count(), 16);
        assert!(!dirty);
    }

    #[test]
    fn dirty_magic_is_accepted_and_reported() {
        let bytes = header_bytes(DIRTY_MAGIC, 4);
        let (_, dirty) = Header::parse(&bytes).unwrap();
        assert!(dirty);
    }

    #[test]
    fn unknown_magic_is_rejected() {
        let bytes = header_bytes(b"XXXX", 4);
        let err = Header::parse(&bytes).unwrap_err();
        assert!(matches!(err, MapError::BadMagic { found: [b'X', ..] }));
    }

    #[test]
    fn non_power_of_two_count_is_rejected() {
        for count in [0u32, 3, 6, 1000] {
            let bytes = header_bytes(CLEAN_MAGIC, count);
            assert!(matches!(
                Header::parse(&bytes),
                Err(MapError::Corrupt(_))
            ));
        }
    }

    #[test]
    fn truncated_header_is_rejected() {
        assert!(matches!(
            Header::parse(&[b'L', b'E', b'D']),
            Err(MapError::Corrupt(_))
        ));
    }

    #[test]
    fn payload_geometry() {
        let header = Header::new(8);
        assert_eq!(header.payload_start(BucketLayout::Combined), 8 + 8 * 4);
        assert_eq!(header.payload_start(BucketLayout::Split), 8 + 8 * 8);
    }

    #[test]
    fn round_trips_as_bytes() {
        let header = Header::new(64);
        let bytes = header.as_bytes();
        assert_eq!(&bytes[..4], CLEAN_MAGIC);
        assert_eq!(&bytes[4..], &64u32.to_le_bytes());
    }
}
