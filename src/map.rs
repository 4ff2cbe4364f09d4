//! The public map handle: open, look up, iterate, close.
//!
//! A `ColdMap` owns one read-only mapping of a finished map file and serves
//! lookups from it without loading anything onto the heap. The handle holds
//! no mutable state, so any number of threads may call [`ColdMap::get`]
//! concurrently; there is nothing to contend over.
//!
//! Returned key and value slices borrow the mapping and stay valid for the
//! life of the handle — the mapping is established once and never remapped.
//! Hosts that need the bytes to outlive the handle copy them.
//!
//! Every lookup first samples the dirty sentinel. A builder that rewrites
//! the file in place flips byte 3 of the magic to `D` first, and readers
//! fail fast with [`MapError::Dirty`] until it flips back. The check is
//! advisory: between the sentinel read and the table reads that follow, a
//! builder could still begin mutating bytes this lookup is about to
//! consult. Builders that publish by atomic rename avoid the gap entirely —
//! an open handle then keeps seeing the old, consistent snapshot until it
//! is reopened.

use std::path::Path;

use crate::error::{MapError, Result};
use crate::format::BucketLayout;
use crate::mmap::MappedFile;
use crate::table::TableView;

#[derive(Debug)]
pub struct ColdMap {
    file: MappedFile,
    layout: BucketLayout,
    bucket_count: u32,
    dirty_at_open: bool,
}

impl ColdMap {
    /// Opens a map file in the canonical combined layout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_layout(path, BucketLayout::Combined)
    }

    /// Opens a map file, selecting the bucket layout explicitly.
    ///
    /// The header carries no version field, so the layout cannot be
    /// detected from the file; legacy split-layout files need
    /// [`BucketLayout::Split`] passed here.
    ///
    /// A dirty file opens successfully — dirtiness is reported per lookup,
    /// and [`ColdMap::dirty_at_open`] records what the magic said at open
    /// time.
    pub fn open_with_layout<P: AsRef<Path>>(path: P, layout: BucketLayout) -> Result<Self> {
        let file = MappedFile::open(path.as_ref())?;
        let (view, dirty_at_open) = TableView::parse(file.bytes(), layout)?;
        let bucket_count = view.bucket_count();

        Ok(Self {
            file,
            layout,
            bucket_count,
            dirty_at_open,
        })
    }

    /// Looks up `key`, returning the stored value bytes.
    ///
    /// `Ok(None)` means the key is absent; that is an answer, not an error.
    /// Fails with [`MapError::Dirty`] while a rebuild is in progress and
    /// [`MapError::Corrupt`] when the file violates the format.
    pub fn get(&self, key: &[u8]) -> Result<Option<&[u8]>> {
        self.check_dirty()?;
        self.view().lookup(key)
    }

    /// Looks up `key` and decodes the value as UTF-8 text.
    ///
    /// Distinguishes a missing key (`Ok(None)`) from a present value that
    /// is not valid UTF-8 ([`MapError::NotUtf8`]). The missing-key path
    /// allocates nothing.
    pub fn get_text(&self, key: &[u8]) -> Result<Option<&str>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(std::str::from_utf8(bytes)?)),
            None => Ok(None),
        }
    }

    /// Iterates all entries in bucket-table order.
    ///
    /// The dirty sentinel is sampled once, when the iterator is created;
    /// corrupt records surface as `Err` items.
    pub fn iter(&self) -> Result<Entries<'_>> {
        self.check_dirty()?;
        Ok(Entries {
            view: self.view(),
            next_idx: 0,
        })
    }

    /// Releases the mapping.
    ///
    /// Dropping the handle does the same; this form just makes the point
    /// of release explicit at call sites. Double close is unrepresentable:
    /// the handle is consumed.
    pub fn close(self) {}

    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    pub fn layout(&self) -> BucketLayout {
        self.layout
    }

    /// Live sample of the dirty sentinel.
    pub fn is_dirty(&self) -> bool {
        self.file.is_dirty()
    }

    /// Whether the file carried the dirty magic when this handle opened it.
    pub fn dirty_at_open(&self) -> bool {
        self.dirty_at_open
    }

    pub fn file_len(&self) -> usize {
        self.file.len()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of occupied buckets; scans the whole table.
    pub fn len(&self) -> Result<u32> {
        self.check_dirty()?;
        self.view().occupied()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Hints the OS to fault the mapping in ahead of a lookup burst.
    pub fn prefetch(&self) {
        self.file.prefetch();
    }

    fn view(&self) -> TableView<'_> {
        // Geometry from open time, not a re-parse: an in-place rewrite can
        // scribble over the header bytes mid-lookup, and every access below
        // is bounds-checked against the fixed mapping length anyway.
        TableView::from_parts(self.file.bytes(), self.layout, self.bucket_count)
    }

    fn check_dirty(&self) -> Result<()> {
        if self.file.is_dirty() {
            Err(MapError::Dirty)
        } else {
            Ok(())
        }
    }
}

/// Iterator over `(key, value)` pairs in bucket-table order.
#[derive(Debug)]
pub struct Entries<'a> {
    view: TableView<'a>,
    next_idx: u32,
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<(&'a [u8], &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_idx < self.view.bucket_count() {
            let idx = self.next_idx;
            self.next_idx += 1;
            match self.view.entry(idx) {
                Ok(None) => continue,
                Ok(Some(pair)) => return Some(Ok(pair)),
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_shareable_across_threads() {
        fn check<T: Send + Sync>() {}
        check::<ColdMap>();
        check::<Entries<'_>>();
    }
}
