//! Binary snapshot format.
//!
//! One self-describing file carries everything the serve phase needs to skip
//! the O(V³) precomputation: the routing settings, the row-major all-pairs
//! table and, optionally, the graph topology with per-edge metadata. Framing
//! follows the house style: little-endian fixed-width fields behind a
//! magic/version/flags header, CRC-64 footer over everything before it.

pub mod crc;
pub mod snapshot;

use thiserror::Error;

use crate::error::ConstructionError;

/// A snapshot failed to decode, or could not be turned back into a usable
/// router. The caller's recovery is to rebuild from the catalogue.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic: expected {expected:#010x}, got {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    #[error("snapshot truncated: need {needed} bytes, have {got}")]
    Truncated { needed: usize, got: usize },

    #[error("checksum mismatch: stored {stored:#018x}, computed {computed:#018x}")]
    ChecksumMismatch { stored: u64, computed: u64 },

    #[error("snapshot has no topology section")]
    TopologyMissing,

    #[error("snapshot has an unexpected topology section")]
    TopologyUnexpected,

    #[error("{what} index {index} out of range (count {count})")]
    IndexOutOfRange {
        what: &'static str,
        index: u32,
        count: u32,
    },

    #[error("malformed snapshot: {0}")]
    Malformed(String),

    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

pub use snapshot::{Snapshot, SnapshotFile};
