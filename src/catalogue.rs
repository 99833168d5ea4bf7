//! Stop and bus registry.
//!
//! Stops and buses live in dense arenas and are addressed everywhere by
//! `u32` ids; a stop's id doubles as its graph vertex id. Road distances
//! are keyed by ordered id pairs. The lexicographically sorted name lists
//! exposed here are the index spaces the snapshot format persists, so both
//! the build and the serve process must derive them from the same catalogue
//! content.

use std::collections::{BTreeSet, HashMap, HashSet};

use itertools::Itertools;
use log::debug;

use crate::error::LookupError;
use crate::geo::{haversine_distance, Coordinates};

pub type StopId = u32;
pub type BusId = u32;

#[derive(Debug)]
pub struct Stop {
    pub name: String,
    pub coords: Coordinates,
    /// Buses calling at this stop.
    pub buses: BTreeSet<BusId>,
}

#[derive(Debug)]
pub struct Bus {
    pub name: String,
    /// Full stop sequence as travelled. For a non-ring route this is the
    /// declared sequence followed by its reverse.
    pub stops: Vec<StopId>,
    pub is_ring: bool,
    pub unique_stops: u32,
    /// Road length of the full sequence, metres.
    pub road_length: f64,
    /// road_length over the great-circle length of the same sequence.
    pub curvature: f64,
}

#[derive(Debug, Default)]
pub struct Catalogue {
    stops: Vec<Stop>,
    buses: Vec<Bus>,
    stop_ids: HashMap<String, StopId>,
    bus_ids: HashMap<String, BusId>,
    distances: HashMap<(StopId, StopId), f64>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stop and assign it the next vertex id. Registering a name
    /// twice returns the existing id; the first registration wins.
    pub fn add_stop(&mut self, name: &str, coords: Coordinates) -> StopId {
        if let Some(&id) = self.stop_ids.get(name) {
            return id;
        }
        let id = self.stops.len() as StopId;
        self.stops.push(Stop {
            name: name.to_string(),
            coords,
            buses: BTreeSet::new(),
        });
        self.stop_ids.insert(name.to_string(), id);
        id
    }

    /// Record an explicit road distance for the ordered pair `(from, to)`.
    pub fn add_distance(&mut self, from: StopId, to: StopId, metres: f64) {
        self.distances.insert((from, to), metres);
    }

    /// Register a bus over the given stop sequence. Non-ring routes are
    /// expanded here, once, into forward-then-reverse travel order.
    /// Registering a name twice returns the existing id.
    pub fn add_bus(&mut self, name: &str, stops: Vec<StopId>, is_ring: bool) -> BusId {
        if let Some(&id) = self.bus_ids.get(name) {
            return id;
        }
        let id = self.buses.len() as BusId;

        let mut sequence = stops;
        if !is_ring && sequence.len() > 1 {
            let way_back: Vec<StopId> = sequence.iter().rev().skip(1).copied().collect();
            sequence.extend(way_back);
        }

        let unique_stops = sequence.iter().collect::<HashSet<_>>().len() as u32;
        let road_length: f64 = sequence
            .iter()
            .tuple_windows()
            .map(|(&a, &b)| self.distance(a, b))
            .sum();
        let geo_length: f64 = sequence
            .iter()
            .tuple_windows()
            .map(|(&a, &b)| {
                haversine_distance(self.stops[a as usize].coords, self.stops[b as usize].coords)
            })
            .sum();
        let curvature = if geo_length > 0.0 {
            road_length / geo_length
        } else {
            0.0
        };

        for &stop in &sequence {
            self.stops[stop as usize].buses.insert(id);
        }
        self.buses.push(Bus {
            name: name.to_string(),
            stops: sequence,
            is_ring,
            unique_stops,
            road_length,
            curvature,
        });
        self.bus_ids.insert(name.to_string(), id);
        id
    }

    /// Road distance from `from` to `to` in metres: the explicit distance
    /// for `(from, to)`, else the one for `(to, from)`, else the
    /// great-circle distance between the stops' coordinates. The fallback
    /// mixes a geographic metric into road data and is a known
    /// approximation; it is logged rather than signalled to the caller.
    pub fn distance(&self, from: StopId, to: StopId) -> f64 {
        if let Some(&metres) = self.distances.get(&(from, to)) {
            return metres;
        }
        if let Some(&metres) = self.distances.get(&(to, from)) {
            return metres;
        }
        let fallback = haversine_distance(
            self.stops[from as usize].coords,
            self.stops[to as usize].coords,
        );
        debug!(
            "no road distance {:?} -> {:?}, using great-circle {:.0} m",
            self.stops[from as usize].name, self.stops[to as usize].name, fallback
        );
        fallback
    }

    pub fn stop_id(&self, name: &str) -> Result<StopId, LookupError> {
        self.stop_ids
            .get(name)
            .copied()
            .ok_or_else(|| LookupError::UnknownStop(name.to_string()))
    }

    pub fn bus_id(&self, name: &str) -> Result<BusId, LookupError> {
        self.bus_ids
            .get(name)
            .copied()
            .ok_or_else(|| LookupError::UnknownBus(name.to_string()))
    }

    pub fn stop(&self, id: StopId) -> &Stop {
        &self.stops[id as usize]
    }

    pub fn bus(&self, id: BusId) -> &Bus {
        &self.buses[id as usize]
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    /// Number of graph vertices: one per stop, set even when no bus exists,
    /// so queries on a bus-less network report "no route" instead of failing.
    pub fn vertex_count(&self) -> u32 {
        self.stops.len() as u32
    }

    /// Stop ids ordered by name. The position of an id in this list is the
    /// stop index the snapshot format persists.
    pub fn sorted_stop_ids(&self) -> Vec<StopId> {
        let mut ids: Vec<StopId> = (0..self.stops.len() as StopId).collect();
        ids.sort_by(|&a, &b| self.stops[a as usize].name.cmp(&self.stops[b as usize].name));
        ids
    }

    /// Bus ids ordered by name; same role as [`Self::sorted_stop_ids`].
    pub fn sorted_bus_ids(&self) -> Vec<BusId> {
        let mut ids: Vec<BusId> = (0..self.buses.len() as BusId).collect();
        ids.sort_by(|&a, &b| self.buses[a as usize].name.cmp(&self.buses[b as usize].name));
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(lat: f64, lon: f64) -> Coordinates {
        Coordinates { lat, lon }
    }

    #[test]
    fn test_stop_ids_follow_insertion_order() {
        let mut catalogue = Catalogue::new();
        assert_eq!(catalogue.add_stop("B", coords(0.0, 0.0)), 0);
        assert_eq!(catalogue.add_stop("A", coords(0.0, 1.0)), 1);
        // Duplicate registration keeps the original id.
        assert_eq!(catalogue.add_stop("B", coords(9.0, 9.0)), 0);
        assert_eq!(catalogue.vertex_count(), 2);
    }

    #[test]
    fn test_linear_route_is_expanded_with_its_reverse() {
        let mut catalogue = Catalogue::new();
        let a = catalogue.add_stop("A", coords(0.0, 0.0));
        let b = catalogue.add_stop("B", coords(0.0, 0.01));
        let c = catalogue.add_stop("C", coords(0.0, 0.02));
        let bus = catalogue.add_bus("7", vec![a, b, c], false);
        assert_eq!(catalogue.bus(bus).stops, vec![a, b, c, b, a]);
        assert_eq!(catalogue.bus(bus).unique_stops, 3);
    }

    #[test]
    fn test_ring_route_is_stored_as_declared() {
        let mut catalogue = Catalogue::new();
        let a = catalogue.add_stop("A", coords(0.0, 0.0));
        let b = catalogue.add_stop("B", coords(0.0, 0.01));
        let bus = catalogue.add_bus("9", vec![a, b, a], true);
        assert_eq!(catalogue.bus(bus).stops, vec![a, b, a]);
    }

    #[test]
    fn test_distance_lookup_order_and_fallback() {
        let mut catalogue = Catalogue::new();
        let a = catalogue.add_stop("A", coords(55.0, 37.0));
        let b = catalogue.add_stop("B", coords(55.0, 37.1));
        catalogue.add_distance(a, b, 1200.0);

        // Forward hit.
        assert_eq!(catalogue.distance(a, b), 1200.0);
        // Reverse direction falls back to the recorded opposite pair.
        assert_eq!(catalogue.distance(b, a), 1200.0);

        // No record in either direction: great-circle fallback, which for
        // 0.1 degrees of longitude at this latitude is a few kilometres.
        let c = catalogue.add_stop("C", coords(55.0, 37.2));
        let geo = catalogue.distance(b, c);
        assert!(geo > 5_000.0 && geo < 8_000.0, "got {geo}");

        // An explicit forward record beats the reverse one.
        catalogue.add_distance(b, a, 900.0);
        assert_eq!(catalogue.distance(b, a), 900.0);
    }

    #[test]
    fn test_road_length_uses_recorded_distances_both_ways() {
        let mut catalogue = Catalogue::new();
        let a = catalogue.add_stop("A", coords(55.0, 37.00));
        let b = catalogue.add_stop("B", coords(55.0, 37.01));
        catalogue.add_distance(a, b, 1000.0);
        catalogue.add_distance(b, a, 1500.0);

        let bus = catalogue.add_bus("3", vec![a, b], false);
        // Expanded to A,B,A: forward leg 1000 + return leg 1500.
        assert_eq!(catalogue.bus(bus).road_length, 2500.0);
        assert!(catalogue.bus(bus).curvature > 1.0);
    }

    #[test]
    fn test_sorted_name_lists() {
        let mut catalogue = Catalogue::new();
        catalogue.add_stop("Depot", coords(0.0, 0.0));
        catalogue.add_stop("Airport", coords(0.0, 0.0));
        catalogue.add_stop("Centre", coords(0.0, 0.0));
        let sorted = catalogue.sorted_stop_ids();
        let names: Vec<&str> = sorted
            .iter()
            .map(|&id| catalogue.stop(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["Airport", "Centre", "Depot"]);
    }

    #[test]
    fn test_unknown_names_are_lookup_errors() {
        let catalogue = Catalogue::new();
        assert_eq!(
            catalogue.stop_id("Nowhere"),
            Err(LookupError::UnknownStop("Nowhere".to_string()))
        );
        assert_eq!(
            catalogue.bus_id("0"),
            Err(LookupError::UnknownBus("0".to_string()))
        );
    }

    #[test]
    fn test_buses_at_stop() {
        let mut catalogue = Catalogue::new();
        let a = catalogue.add_stop("A", coords(0.0, 0.0));
        let b = catalogue.add_stop("B", coords(0.0, 0.01));
        let first = catalogue.add_bus("1", vec![a, b], false);
        let second = catalogue.add_bus("2", vec![b, a], false);
        assert_eq!(
            catalogue.stop(a).buses.iter().copied().collect::<Vec<_>>(),
            vec![first, second]
        );
    }
}
