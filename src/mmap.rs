//! Read-only memory mapping of a map file.
//!
//! `MappedFile` is the only component that touches raw mapped memory.
//! Everything above it sees a bounds-checked `&[u8]` view, so a truncated
//! or hostile file can produce `Corrupt` errors but never an out-of-bounds
//! read. The mapping is established once at open and released by `Drop` on
//! every exit path; it is never remapped, which is what makes handing out
//! borrowed value slices sound.
//!
//! The dirty sentinel read is volatile: the builder flips that byte from
//! another process through a shared mapping, and a cached read would let a
//! reader keep trusting a file that is being rewritten under it.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{MapError, Result};
use crate::format::{DIRTY_SENTINEL, HEADER_SIZE, SENTINEL_OFFSET};

#[derive(Debug)]
pub struct MappedFile {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFile {
    /// Opens `path` read-only and maps it shared.
    ///
    /// Fails with `NotFound` when the path does not exist, `Io` for other
    /// open or metadata failures, and `MapFailed` when the OS refuses the
    /// mapping. The file must be at least `HEADER_SIZE` bytes; anything
    /// shorter cannot even hold the magic and is reported as `Corrupt`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                MapError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                MapError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let len = file
            .metadata()
            .map_err(|source| MapError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if (len as usize) < HEADER_SIZE {
            return Err(MapError::Corrupt("file shorter than the 8-byte header"));
        }

        // SAFETY: Mmap::map is unsafe because the file can change under the
        // mapping. The format is built for exactly that: the file is owned
        // by an offline builder, readers treat every byte as untrusted and
        // bounds-check all decoding, and concurrent rewrites are flagged
        // through the dirty sentinel. No slice derived from this mapping is
        // ever interpreted as anything but plain bytes.
        let mmap = unsafe {
            Mmap::map(&file).map_err(|source| MapError::MapFailed {
                path: path.to_path_buf(),
                source,
            })?
        };

        Ok(Self {
            mmap,
            path: path.to_path_buf(),
        })
    }

    /// The whole file as a byte slice.
    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples the dirty sentinel as it is on disk right now.
    ///
    /// Advisory only: the builder may start a rewrite between this read and
    /// the table reads that follow it. The read is volatile so each lookup
    /// observes the current byte rather than a value cached across calls.
    pub fn is_dirty(&self) -> bool {
        // SAFETY: open() verified the mapping is at least HEADER_SIZE bytes,
        // and SENTINEL_OFFSET lies inside the header.
        let sentinel =
            unsafe { std::ptr::read_volatile(self.mmap.as_ptr().add(SENTINEL_OFFSET)) };
        sentinel == DIRTY_SENTINEL
    }

    /// Advises the OS to fault the whole mapping in ahead of use.
    ///
    /// A hint: failures are ignored, and platforms without madvise get a
    /// no-op.
    pub fn prefetch(&self) {
        #[cfg(unix)]
        let _ = self.mmap.advise(memmap2::Advice::WillNeed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::format::CLEAN_MAGIC;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = MappedFile::open(&dir.path().join("absent.leda")).unwrap_err();
        assert!(matches!(err, MapError::NotFound { .. }));
    }

    #[test]
    fn open_rejects_files_shorter_than_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "tiny.leda", b"LED");
        let err = MappedFile::open(&path).unwrap_err();
        assert!(matches!(err, MapError::Corrupt(_)));
    }

    #[test]
    fn maps_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = CLEAN_MAGIC.to_vec();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        let path = write_file(dir.path(), "map.leda", &bytes);

        let mapped = MappedFile::open(&path).unwrap();
        assert_eq!(mapped.len(), bytes.len());
        assert_eq!(mapped.bytes(), &bytes[..]);
        assert!(!mapped.is_dirty());
        assert_eq!(mapped.path(), path);
    }

    #[test]
    fn sentinel_flip_is_observed_through_the_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = CLEAN_MAGIC.to_vec();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        let path = write_file(dir.path(), "map.leda", &bytes);

        let mapped = MappedFile::open(&path).unwrap();
        assert!(!mapped.is_dirty());

        let mut rewrite = std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap();
        use std::io::Seek;
        rewrite.seek(std::io::SeekFrom::Start(0)).unwrap();
        rewrite.write_all(crate::format::DIRTY_MAGIC).unwrap();
        rewrite.sync_all().unwrap();

        assert!(mapped.is_dirty());
    }
}
