//! All-pairs shortest-path precomputation.
//!
//! For every ordered vertex pair the router stores the minimum path weight
//! and the last edge on that path, so a concrete route is rebuilt backwards
//! in O(path length). The table is filled by relaxing the original edge set
//! through every intermediate vertex in order (Floyd-Warshall restricted to
//! the given edge list): O(V³) time, O(V²) space. That cost is exactly what
//! the snapshot format exists to avoid paying twice: a router can instead be
//! assembled from a previously persisted table via [`Router::from_table`].

use log::debug;

use crate::error::ConstructionError;
use crate::graph::{DirectedWeightedGraph, EdgeId, VertexId};

/// Best known path for one ordered vertex pair: total weight plus the edge
/// taken last. `prev_edge` is `None` only on the diagonal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteInternalData {
    pub weight: f64,
    pub prev_edge: Option<EdgeId>,
}

/// A reconstructed shortest path: total weight and edge ids in travel order.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInfo {
    pub weight: f64,
    pub edges: Vec<EdgeId>,
}

pub struct Router {
    graph: DirectedWeightedGraph,
    // Row-major |V|² table; absent cells mean "no path known".
    table: Vec<Option<RouteInternalData>>,
}

impl Router {
    /// Run the full precomputation over `graph`. Any negative edge weight is
    /// a construction error and no table escapes.
    pub fn new(graph: DirectedWeightedGraph) -> Result<Self, ConstructionError> {
        let n = graph.vertex_count() as usize;
        let mut router = Router {
            graph,
            table: vec![None; n * n],
        };
        router.initialize()?;
        for through in 0..n as VertexId {
            router.relax_through(through);
        }
        debug!(
            "routing table ready: {} vertices, {} edges, {} reachable pairs",
            n,
            router.graph.edge_count(),
            router.table.iter().filter(|cell| cell.is_some()).count()
        );
        Ok(router)
    }

    /// Assemble a router from a previously persisted table, skipping the
    /// precomputation entirely. The table must have been computed for a
    /// graph with this one's vertex count.
    pub fn from_table(graph: DirectedWeightedGraph, table: Vec<Option<RouteInternalData>>) -> Self {
        let n = graph.vertex_count() as usize;
        debug_assert_eq!(table.len(), n * n);
        Router { graph, table }
    }

    /// Direct paths: zero-weight diagonal, then every edge as a one-hop
    /// candidate. Strict improvement only, so the earliest of equal-weight
    /// parallel edges wins.
    fn initialize(&mut self) -> Result<(), ConstructionError> {
        let n = self.graph.vertex_count() as usize;
        for vertex in 0..n as VertexId {
            self.table[vertex as usize * n + vertex as usize] = Some(RouteInternalData {
                weight: 0.0,
                prev_edge: None,
            });
            for edge_id in self.graph.incident_edges(vertex) {
                let edge = *self.graph.edge(edge_id);
                if edge.weight < 0.0 {
                    return Err(ConstructionError::NegativeEdgeWeight {
                        edge: edge_id,
                        weight: edge.weight,
                    });
                }
                let cell = &mut self.table[vertex as usize * n + edge.to as usize];
                let improves = match cell {
                    Some(existing) => edge.weight < existing.weight,
                    None => true,
                };
                if improves {
                    *cell = Some(RouteInternalData {
                        weight: edge.weight,
                        prev_edge: Some(edge_id),
                    });
                }
            }
        }
        Ok(())
    }

    /// One relaxation pass: try to improve every `(from, to)` pair by going
    /// through `through`. The candidate's last edge is the `through -> to`
    /// half's, falling back to the `from -> through` half's when the second
    /// half is the empty diagonal path.
    fn relax_through(&mut self, through: VertexId) {
        let n = self.graph.vertex_count() as usize;
        let through = through as usize;
        for from in 0..n {
            let route_from = match self.table[from * n + through] {
                Some(data) => data,
                None => continue,
            };
            for to in 0..n {
                let route_to = match self.table[through * n + to] {
                    Some(data) => data,
                    None => continue,
                };
                let candidate = route_from.weight + route_to.weight;
                let cell = &mut self.table[from * n + to];
                let improves = match cell {
                    Some(existing) => candidate < existing.weight,
                    None => true,
                };
                if improves {
                    *cell = Some(RouteInternalData {
                        weight: candidate,
                        prev_edge: route_to.prev_edge.or(route_from.prev_edge),
                    });
                }
            }
        }
    }

    /// Minimum-weight path from `from` to `to`, or `None` when the pair is
    /// unreachable. Edges come back in travel order.
    pub fn route(&self, from: VertexId, to: VertexId) -> Option<RouteInfo> {
        let n = self.graph.vertex_count() as usize;
        let target = self.table[from as usize * n + to as usize]?;

        let mut edges = Vec::new();
        let mut edge_id = target.prev_edge;
        while let Some(id) = edge_id {
            edges.push(id);
            let boarding = self.graph.edge(id).from;
            edge_id = self.table[from as usize * n + boarding as usize]
                .and_then(|cell| cell.prev_edge);
        }
        edges.reverse();

        Some(RouteInfo {
            weight: target.weight,
            edges,
        })
    }

    pub fn graph(&self) -> &DirectedWeightedGraph {
        &self.graph
    }

    /// The raw row-major table, for the snapshot codec.
    pub fn table(&self) -> &[Option<RouteInternalData>] {
        &self.table
    }
}
