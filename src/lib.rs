//! # coldmap - Read-Only Memory-Mapped Hash Maps
//!
//! coldmap serves point lookups against an immutable key→value dataset
//! built offline, straight from a memory-mapped file:
//!
//! - **Zero-copy access**: values are slices of the mapping, no buffers
//! - **Zero heap for the dataset**: the OS page cache is the cache
//! - **Lock-free reads**: no mutable state, share one handle across threads
//!
//! ## Quick Start
//!
//! ```no_run
//! use coldmap::{ColdMap, ColdMapBuilder};
//!
//! # fn main() -> eyre::Result<()> {
//! let mut builder = ColdMapBuilder::new();
//! builder.insert("sloth", "a slow-moving arboreal mammal");
//! builder.publish("words.leda")?;
//!
//! let map = ColdMap::open("words.leda")?;
//! assert_eq!(map.get_text(b"sloth")?, Some("a slow-moving arboreal mammal"));
//! assert_eq!(map.get(b"missing")?, None);
//! # Ok(())
//! # }
//! ```
//!
//! ## File Layout
//!
//! ```text
//! +--------------------------------------+
//! | "LEDA" magic      | bucket_count u32 |  8-byte header
//! +--------------------------------------+
//! | bucket table: count x u32 pointer(s) |  0 = empty slot
//! +--------------------------------------+
//! | payload: length-prefixed records     |
//! +--------------------------------------+
//! ```
//!
//! The builder and the reader share one unseeded hash ([`stable_hash`])
//! and one probe recurrence; a file built anywhere reads identically
//! everywhere. Byte 3 of the magic doubles as a dirty sentinel: a builder
//! rewriting the file in place flips it to `D`, and every lookup checks it
//! first (see [`error::MapError::Dirty`]).
//!
//! ## Module Overview
//!
//! - [`map`]: the `ColdMap` handle — open, get, get_text, iterate
//! - [`builder`]: offline `ColdMapBuilder` and atomic publication
//! - [`table`]: bucket traversal and record decoding over any image
//! - [`format`]: header, magic tags, bucket layouts
//! - [`hash`] / [`probe`]: the build/lookup contract
//! - [`mmap`]: the read-only mapping and the volatile sentinel read

pub mod builder;
pub mod error;
pub mod format;
pub mod hash;
pub mod map;
pub mod mmap;
pub mod probe;
pub mod table;

pub use builder::{BuildStats, ColdMapBuilder};
pub use error::{MapError, Result};
pub use format::BucketLayout;
pub use hash::stable_hash;
pub use map::{ColdMap, Entries};
