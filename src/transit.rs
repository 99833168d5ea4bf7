//! Transit graph builder and itinerary queries.
//!
//! Every reachable (boarding, alighting) pair of each bus becomes one graph
//! edge whose weight is the boarding wait plus the accumulated ride time, so
//! "ride N stops without alighting" is a single edge and the generic
//! all-pairs router finds optimal transfer sequences on its own. The price
//! is edge-count density, O(stops²) per route, paid once at build time.

use itertools::Itertools;
use log::info;
use serde::Deserialize;

use crate::catalogue::{BusId, Catalogue, StopId};
use crate::error::{ConstructionError, LookupError};
use crate::formats::snapshot::{Snapshot, SnapshotEdge, SnapshotEdgeInfo, Topology};
use crate::formats::PersistenceError;
use crate::graph::DirectedWeightedGraph;
use crate::router::Router;

/// km/h to metres per minute.
const KMH_TO_M_PER_MIN: f64 = 1000.0 / 60.0;

/// Weights below this are treated as the empty from == to itinerary.
const TIME_EPSILON: f64 = 1e-6;

/// Fixed at build time; the routing table is only valid for the settings it
/// was computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RoutingSettings {
    /// Minutes spent waiting at a stop before every boarding.
    pub bus_wait_time: u32,
    /// Bus velocity, km/h.
    pub bus_velocity: u32,
}

/// Per-edge annotation used only to turn an edge sequence back into a
/// human-meaningful itinerary; the router never looks at it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeInfo {
    pub stop: StopId,
    pub bus: BusId,
    pub span_count: u32,
}

/// One itinerary segment: wait at `stop`, then ride `bus` for `span_count`
/// stops. Times are minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub stop: StopId,
    pub bus: BusId,
    pub wait_time: f64,
    pub run_time: f64,
    pub span_count: u32,
}

/// The answer to one query; created and discarded per request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRoute {
    pub total_time: f64,
    pub lines: Vec<Line>,
}

pub struct TransitRouter {
    catalogue: Catalogue,
    settings: RoutingSettings,
    /// Indexed by edge id, parallel to the graph's edge list.
    edges: Vec<EdgeInfo>,
    router: Router,
}

impl TransitRouter {
    /// Build the transit graph from the catalogue and run the full all-pairs
    /// precomputation. The graph is laid out exactly once per process; a
    /// rebuild is not expressible; construct a new router instead.
    pub fn build(
        catalogue: Catalogue,
        settings: RoutingSettings,
    ) -> Result<Self, ConstructionError> {
        let (graph, edges) = build_edges(&catalogue, settings)?;
        info!(
            "transit graph: {} stops, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        let router = Router::new(graph)?;
        Ok(TransitRouter {
            catalogue,
            settings,
            edges,
            router,
        })
    }

    /// Reassemble a router from a deserialized snapshot, skipping the O(V³)
    /// precomputation. With a topology section the graph and edge metadata
    /// come straight from the blob; without one they are rebuilt from the
    /// live catalogue and the table is trusted as-is; whether that
    /// catalogue still matches the one the table was computed from is the
    /// caller's invariant to keep.
    pub fn from_snapshot(
        catalogue: Catalogue,
        snapshot: Snapshot,
    ) -> Result<Self, PersistenceError> {
        let settings = snapshot.settings;
        match snapshot.topology {
            Some(topology) => {
                let mut graph = DirectedWeightedGraph::new();
                graph.set_vertex_count(snapshot.vertex_count)?;
                for edge in &topology.edges {
                    graph.add_edge(edge.from, edge.to, edge.weight)?;
                }
                let edges = resolve_edge_infos(&catalogue, &topology.infos)?;
                Ok(TransitRouter {
                    catalogue,
                    settings,
                    edges,
                    router: Router::from_table(graph, snapshot.table),
                })
            }
            None => {
                if snapshot.vertex_count != catalogue.vertex_count() {
                    return Err(PersistenceError::Malformed(format!(
                        "table is for {} stops but the catalogue has {}",
                        snapshot.vertex_count,
                        catalogue.vertex_count()
                    )));
                }
                let (graph, edges) = build_edges(&catalogue, settings)?;
                Ok(TransitRouter {
                    catalogue,
                    settings,
                    edges,
                    router: Router::from_table(graph, snapshot.table),
                })
            }
        }
    }

    /// Shortest itinerary between two named stops. `Ok(None)` means the
    /// stops exist but no bus sequence connects them; identical or
    /// effectively-zero-cost queries return an empty itinerary with zero
    /// total time.
    pub fn build_route(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Option<CompletedRoute>, LookupError> {
        let from = self.catalogue.stop_id(from)?;
        let to = self.catalogue.stop_id(to)?;

        let info = match self.router.route(from, to) {
            Some(info) => info,
            None => return Ok(None),
        };
        if info.weight < TIME_EPSILON {
            return Ok(Some(CompletedRoute {
                total_time: 0.0,
                lines: Vec::new(),
            }));
        }

        let wait_time = self.settings.bus_wait_time as f64;
        let lines = info
            .edges
            .iter()
            .map(|&edge_id| {
                let edge_info = self.edges[edge_id as usize];
                Line {
                    stop: edge_info.stop,
                    bus: edge_info.bus,
                    wait_time,
                    run_time: self.router.graph().edge(edge_id).weight - wait_time,
                    span_count: edge_info.span_count,
                }
            })
            .collect();

        Ok(Some(CompletedRoute {
            total_time: info.weight,
            lines,
        }))
    }

    /// Package the current state for persistence. The topology section is
    /// optional: without it a later process rebuilds the graph from its own
    /// catalogue and only the table is reused.
    pub fn to_snapshot(&self, include_topology: bool) -> Snapshot {
        let graph = self.router.graph();
        let topology = include_topology.then(|| {
            let sorted_stops = self.catalogue.sorted_stop_ids();
            let sorted_buses = self.catalogue.sorted_bus_ids();
            let mut stop_index = vec![0u32; sorted_stops.len()];
            for (position, &id) in sorted_stops.iter().enumerate() {
                stop_index[id as usize] = position as u32;
            }
            let mut bus_index = vec![0u32; sorted_buses.len()];
            for (position, &id) in sorted_buses.iter().enumerate() {
                bus_index[id as usize] = position as u32;
            }

            Topology {
                edges: graph
                    .edges()
                    .iter()
                    .map(|edge| SnapshotEdge {
                        from: edge.from,
                        to: edge.to,
                        weight: edge.weight,
                    })
                    .collect(),
                infos: self
                    .edges
                    .iter()
                    .map(|info| SnapshotEdgeInfo {
                        stop_index: stop_index[info.stop as usize],
                        bus_index: bus_index[info.bus as usize],
                        span_count: info.span_count,
                    })
                    .collect(),
            }
        });

        Snapshot {
            settings: self.settings,
            vertex_count: graph.vertex_count(),
            edge_count: graph.edge_count(),
            table: self.router.table().to_vec(),
            topology,
            created_unix: chrono::Utc::now().timestamp() as u64,
        }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn settings(&self) -> RoutingSettings {
        self.settings
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Lay every bus route out as edges. For each boarding position `i` the
/// ride time accumulates leg by leg, producing one edge per alighting
/// position `j > i` with weight `wait + Σ distance / velocity` and the
/// metadata needed to rebuild an itinerary later.
fn build_edges(
    catalogue: &Catalogue,
    settings: RoutingSettings,
) -> Result<(DirectedWeightedGraph, Vec<EdgeInfo>), ConstructionError> {
    let mut graph = DirectedWeightedGraph::new();
    graph.set_vertex_count(catalogue.vertex_count())?;
    let mut edges = Vec::new();

    let velocity = settings.bus_velocity as f64 * KMH_TO_M_PER_MIN;
    let wait_time = settings.bus_wait_time as f64;

    for (bus_id, bus) in catalogue.buses().iter().enumerate() {
        let stops = &bus.stops;
        let leg_times: Vec<f64> = stops
            .iter()
            .tuple_windows()
            .map(|(&a, &b)| catalogue.distance(a, b) / velocity)
            .collect();

        for boarding in 0..stops.len().saturating_sub(1) {
            let mut time = wait_time;
            for alighting in boarding + 1..stops.len() {
                time += leg_times[alighting - 1];
                let edge_id = graph.add_edge(stops[boarding], stops[alighting], time)?;
                debug_assert_eq!(edge_id as usize, edges.len());
                edges.push(EdgeInfo {
                    stop: stops[boarding],
                    bus: bus_id as BusId,
                    span_count: (alighting - boarding) as u32,
                });
            }
        }
    }

    Ok((graph, edges))
}

/// Resolve persisted sorted-name-list indices back to live catalogue ids.
fn resolve_edge_infos(
    catalogue: &Catalogue,
    infos: &[SnapshotEdgeInfo],
) -> Result<Vec<EdgeInfo>, PersistenceError> {
    let sorted_stops = catalogue.sorted_stop_ids();
    let sorted_buses = catalogue.sorted_bus_ids();

    infos
        .iter()
        .map(|info| {
            let stop = *sorted_stops.get(info.stop_index as usize).ok_or(
                PersistenceError::IndexOutOfRange {
                    what: "stop",
                    index: info.stop_index,
                    count: sorted_stops.len() as u32,
                },
            )?;
            let bus = *sorted_buses.get(info.bus_index as usize).ok_or(
                PersistenceError::IndexOutOfRange {
                    what: "bus",
                    index: info.bus_index,
                    count: sorted_buses.len() as u32,
                },
            )?;
            Ok(EdgeInfo {
                stop,
                bus,
                span_count: info.span_count,
            })
        })
        .collect()
}
