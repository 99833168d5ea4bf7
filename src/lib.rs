//! # transit-route
//!
//! Itinerary routing over a static public-transit network.
//!
//! The expensive part, laying every bus line out as a dense weighted
//! digraph and precomputing all-pairs shortest paths, runs once in the
//! `build` phase and is written to a checksummed binary snapshot. Any number
//! of later `route` processes load the snapshot and answer queries without
//! repeating the precomputation.

pub mod catalogue;
pub mod cli;
pub mod error;
pub mod formats;
pub mod geo;
pub mod graph;
pub mod parse;
pub mod router;
pub mod transit;

pub use catalogue::Catalogue;
pub use graph::DirectedWeightedGraph;
pub use router::Router;
pub use transit::{CompletedRoute, RoutingSettings, TransitRouter};
