//! Error types returned by the reader surface.
//!
//! Lookup callers need to branch on outcomes: a missing key is `Ok(None)`
//! and never an error, a rebuild in progress is [`MapError::Dirty`] and
//! worth retrying, while [`MapError::Corrupt`] means the file violates the
//! format and retrying is pointless. Open-time failures (`NotFound`, `Io`,
//! `MapFailed`, `BadMagic`) never produce a usable handle.
//!
//! The offline builder and the CLI report through `eyre` instead; only the
//! lookup path uses this enum.

use std::io;
use std::path::PathBuf;
use std::str::Utf8Error;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map file not found: '{}'", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to open map file '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to memory-map '{}'", path.display())]
    MapFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unrecognized magic {found:?} in map header")]
    BadMagic { found: [u8; 4] },

    /// The dirty sentinel is set: a builder is rewriting the file in
    /// place. The handle stays usable; retry once the rebuild finishes.
    #[error("map file is dirty (rebuild in progress)")]
    Dirty,

    #[error("value is not valid UTF-8")]
    NotUtf8 {
        #[from]
        source: Utf8Error,
    },

    /// The header or table violates the on-disk format. Covers truncated
    /// files, non-power-of-two bucket counts, record pointers past the end
    /// of the file, and probe sequences that never reach an empty slot.
    #[error("corrupt map file: {0}")]
    Corrupt(&'static str),
}

pub type Result<T> = std::result::Result<T, MapError>;
