//! Offline builder: stages pairs in memory and writes finished map files.
//!
//! Building is tooling, not the lookup path, so failures carry `eyre`
//! context instead of the reader's typed errors. The builder shares the
//! hash and the probe recurrence with the reader — slot assignment here
//! and lookup there must walk identical index sequences, or lookups will
//! silently miss keys that are in the file.
//!
//! Two publication strategies:
//!
//! - [`ColdMapBuilder::write_to_path`] writes the file directly. Fine for
//!   a path no reader has open yet.
//! - [`ColdMapBuilder::publish`] writes a sibling temp file, renames it
//!   over the target atomically, then flips the dirty sentinel of the
//!   *superseded* file through a shared mapping. Readers that opened the
//!   old file keep a consistent snapshot but start failing `Dirty`, which
//!   tells them to reopen; readers opening after the rename see the new
//!   file, already clean.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use eyre::{bail, ensure, Result, WrapErr};
use hashbrown::HashMap;
use memmap2::MmapOptions;
use tempfile::NamedTempFile;

use crate::format::{
    BucketLayout, Header, HEADER_SIZE, MAX_RECORD_LEN, PAGE_ALIGN, SENTINEL_OFFSET,
    DIRTY_SENTINEL,
};
use crate::hash::stable_hash;
use crate::probe::ProbeSequence;

/// Tables are sized to at least four times the entry count, keeping load
/// factor under 25% so probe chains stay short.
const OVERSIZE_FACTOR: usize = 4;

/// Counters from one build, in place of logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub entry_count: usize,
    pub bucket_count: u32,
    /// Occupied slots hit while assigning buckets; a measure of probe
    /// chain length, not an error.
    pub collisions: u64,
}

#[derive(Debug, Default)]
pub struct ColdMapBuilder {
    entries: HashMap<Vec<u8>, Vec<u8>>,
    layout: BucketLayout,
}

impl ColdMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: BucketLayout) -> Self {
        Self {
            entries: HashMap::new(),
            layout,
        }
    }

    /// Stages one pair. Duplicate keys: last write wins.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn layout(&self) -> BucketLayout {
        self.layout
    }

    /// Serializes the staged pairs into a complete map image.
    ///
    /// The image is zero-padded to a 4096-byte multiple and starts with
    /// the clean magic.
    pub fn build_image(&self) -> Result<(Vec<u8>, BuildStats)> {
        for (key, value) in &self.entries {
            ensure!(
                key.len() <= MAX_RECORD_LEN,
                "key of {} bytes exceeds the u16 length field",
                key.len()
            );
            ensure!(
                value.len() <= MAX_RECORD_LEN,
                "value of {} bytes exceeds the u16 length field",
                value.len()
            );
        }

        let bucket_count = bucket_count_for(self.entries.len());
        let (buckets, collisions) = self.assign_buckets(bucket_count)?;

        let mut image = Vec::new();
        image.extend_from_slice(zerocopy::IntoBytes::as_bytes(&Header::new(bucket_count)));

        let payload_start = HEADER_SIZE + bucket_count as usize * self.layout.bucket_size();
        let mut payload: Vec<u8> = Vec::new();

        match self.layout {
            BucketLayout::Combined => {
                for slot in &buckets {
                    match slot {
                        None => image.extend_from_slice(&0u32.to_le_bytes()),
                        Some((key, value)) => {
                            let ptr = record_pointer(payload_start + payload.len())?;
                            image.extend_from_slice(&ptr.to_le_bytes());
                            payload.extend_from_slice(&(key.len() as u16).to_le_bytes());
                            payload.extend_from_slice(&(value.len() as u16).to_le_bytes());
                            payload.extend_from_slice(key);
                            payload.extend_from_slice(value);
                        }
                    }
                }
            }
            BucketLayout::Split => {
                for slot in &buckets {
                    match slot {
                        None => image.extend_from_slice(&[0u8; 8]),
                        Some((key, value)) => {
                            let key_ptr = record_pointer(payload_start + payload.len())?;
                            payload.extend_from_slice(&(key.len() as u16).to_le_bytes());
                            payload.extend_from_slice(key);
                            let value_ptr = record_pointer(payload_start + payload.len())?;
                            payload.extend_from_slice(&(value.len() as u16).to_le_bytes());
                            payload.extend_from_slice(value);
                            image.extend_from_slice(&key_ptr.to_le_bytes());
                            image.extend_from_slice(&value_ptr.to_le_bytes());
                        }
                    }
                }
            }
        }

        image.extend_from_slice(&payload);

        let tail = image.len() & (PAGE_ALIGN - 1);
        if tail != 0 {
            image.resize(image.len() + PAGE_ALIGN - tail, 0);
        }

        let stats = BuildStats {
            entry_count: self.entries.len(),
            bucket_count,
            collisions,
        };
        Ok((image, stats))
    }

    /// Writes the image to `writer`.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<BuildStats> {
        let (image, stats) = self.build_image()?;
        writer
            .write_all(&image)
            .wrap_err("failed to write map image")?;
        Ok(stats)
    }

    /// Writes the image straight to `path`, replacing any existing file.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<BuildStats> {
        let path = path.as_ref();
        let (image, stats) = self.build_image()?;
        std::fs::write(path, &image)
            .wrap_err_with(|| format!("failed to write map file '{}'", path.display()))?;
        Ok(stats)
    }

    /// Publishes the image at `path` without ever exposing a half-written
    /// file.
    ///
    /// The image lands in a sibling temp file that is renamed over the
    /// target. If a previous file was there, its dirty sentinel is flipped
    /// through a shared mapping after the rename, so readers still holding
    /// the superseded mapping fail `Dirty` and know to reopen. The mapping
    /// of the old file is taken before the rename — afterwards the path
    /// already names the new one.
    pub fn publish<P: AsRef<Path>>(&self, path: P) -> Result<BuildStats> {
        let path = path.as_ref();
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());

        let mut temp = match dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new_in("."),
        }
        .wrap_err("failed to create temp file for atomic publish")?;
        let stats = self.write_to(temp.as_file_mut())?;
        temp.as_file_mut()
            .flush()
            .wrap_err("failed to flush temp map file")?;

        let superseded = map_superseded_header(path)?;

        temp.persist(path)
            .wrap_err_with(|| format!("failed to rename map into place at '{}'", path.display()))?;

        if let Some(mut header) = superseded {
            header[SENTINEL_OFFSET] = DIRTY_SENTINEL;
            header
                .flush()
                .wrap_err("failed to flush dirty sentinel of superseded map")?;
        }

        Ok(stats)
    }

    fn assign_buckets(&self, bucket_count: u32) -> Result<(Vec<Option<(&[u8], &[u8])>>, u64)> {
        let mut buckets: Vec<Option<(&[u8], &[u8])>> = vec![None; bucket_count as usize];
        let mut collisions = 0u64;

        for (key, value) in &self.entries {
            let hash = stable_hash(key);
            let mut placed = false;
            for idx in ProbeSequence::new(hash, bucket_count).take(bucket_count as usize) {
                let slot = &mut buckets[idx as usize];
                if slot.is_none() {
                    *slot = Some((key.as_slice(), value.as_slice()));
                    placed = true;
                    break;
                }
                collisions += 1;
            }
            // Unreachable with a table over four times the entry count.
            ensure!(placed, "no free bucket within the probe bound");
        }

        Ok((buckets, collisions))
    }
}

impl<K: Into<Vec<u8>>, V: Into<Vec<u8>>> Extend<(K, V)> for ColdMapBuilder {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// Smallest power of two strictly greater than four times the entry count;
/// 1 for an empty map. Mirrors the reference builder's shift loop, so both
/// sides size identical inputs identically.
fn bucket_count_for(entries: usize) -> u32 {
    let mut value = entries * OVERSIZE_FACTOR;
    let mut shift = 0u32;
    while value > 0 {
        value >>= 1;
        shift += 1;
    }
    1u32 << shift
}

fn record_pointer(offset: usize) -> Result<u32> {
    match u32::try_from(offset) {
        Ok(ptr) => Ok(ptr),
        Err(_) => bail!("map image exceeds the 4 GiB addressable by u32 pointers"),
    }
}

/// Maps the header of the file currently at `path`, if any, for the
/// post-rename dirty flip. Missing file means first publication: nothing
/// to flip.
fn map_superseded_header(path: &Path) -> Result<Option<memmap2::MmapMut>> {
    let file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).wrap_err_with(|| {
                format!("failed to open superseded map '{}'", path.display())
            })
        }
    };

    let len = file
        .metadata()
        .wrap_err("failed to size superseded map")?
        .len();
    if (len as usize) < HEADER_SIZE {
        // Not a map file; leave it alone and let the rename replace it.
        return Ok(None);
    }

    // SAFETY: the mapping covers only the 8-byte header of a file we just
    // verified is at least that long, and is written solely to flip the
    // sentinel byte.
    let mmap = unsafe {
        MmapOptions::new()
            .len(HEADER_SIZE)
            .map_mut(&file)
            .wrap_err("failed to map superseded map header")?
    };
    Ok(Some(mmap))
}
