//! Library-level error types.
//!
//! Construction errors are fatal: they abort the build phase and are never
//! retried. Lookup errors are per-request and recoverable. Persistence
//! errors live next to the codec in [`crate::formats`].

use thiserror::Error;

/// Fatal errors raised while assembling the graph or the routing table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("edge {edge} has negative weight {weight}")]
    NegativeEdgeWeight { edge: u32, weight: f64 },

    #[error("vertex count is already set")]
    VertexCountAlreadySet,

    #[error("vertex {vertex} out of bounds (vertex count {count})")]
    VertexOutOfBounds { vertex: u32, count: u32 },
}

/// A query referenced a name the catalogue has never seen.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LookupError {
    #[error("no such stop {0:?}")]
    UnknownStop(String),

    #[error("no such bus {0:?}")]
    UnknownBus(String),
}
