//! Network definition input.
//!
//! The build phase consumes one JSON document describing the whole network:
//!
//! ```json
//! {
//!   "routing_settings": { "bus_wait_time": 5, "bus_velocity": 60 },
//!   "stops": [
//!     { "name": "A", "lat": 55.7, "lon": 37.6, "road_distances": { "B": 1000 } }
//!   ],
//!   "buses": [
//!     { "name": "297", "stops": ["A", "B", "A"], "is_ring": true }
//!   ]
//! }
//! ```
//!
//! Stops receive vertex ids in file order. Road distances and bus stop
//! lists may reference stops declared anywhere in the file; they are
//! resolved after every stop is registered.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::catalogue::Catalogue;
use crate::error::LookupError;
use crate::geo::Coordinates;
use crate::transit::RoutingSettings;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid network definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

#[derive(Debug, Deserialize)]
struct NetworkDef {
    routing_settings: RoutingSettings,
    #[serde(default)]
    stops: Vec<StopDef>,
    #[serde(default)]
    buses: Vec<BusDef>,
}

#[derive(Debug, Deserialize)]
struct StopDef {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    road_distances: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct BusDef {
    name: String,
    stops: Vec<String>,
    is_ring: bool,
}

/// Parse a network definition document into a catalogue plus settings.
pub fn parse_network(json: &str) -> Result<(Catalogue, RoutingSettings), ParseError> {
    let def: NetworkDef = serde_json::from_str(json)?;
    let mut catalogue = Catalogue::new();

    for stop in &def.stops {
        catalogue.add_stop(
            &stop.name,
            Coordinates {
                lat: stop.lat,
                lon: stop.lon,
            },
        );
    }

    for stop in &def.stops {
        let from = catalogue.stop_id(&stop.name)?;
        for (other, &metres) in &stop.road_distances {
            let to = catalogue.stop_id(other)?;
            catalogue.add_distance(from, to, metres);
        }
    }

    for bus in &def.buses {
        let stops = bus
            .stops
            .iter()
            .map(|name| catalogue.stop_id(name))
            .collect::<Result<Vec<_>, _>>()?;
        catalogue.add_bus(&bus.name, stops, bus.is_ring);
    }

    Ok((catalogue, def.routing_settings))
}

/// [`parse_network`] over a file on disk.
pub fn load_network<P: AsRef<Path>>(path: P) -> Result<(Catalogue, RoutingSettings), ParseError> {
    let json = fs::read_to_string(path)?;
    parse_network(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK: &str = r#"{
        "routing_settings": { "bus_wait_time": 5, "bus_velocity": 60 },
        "stops": [
            { "name": "A", "lat": 55.70, "lon": 37.60,
              "road_distances": { "B": 1000 } },
            { "name": "B", "lat": 55.71, "lon": 37.60,
              "road_distances": { "C": 1000 } },
            { "name": "C", "lat": 55.72, "lon": 37.60 }
        ],
        "buses": [
            { "name": "297", "stops": ["A", "B", "C"], "is_ring": false }
        ]
    }"#;

    #[test]
    fn test_parse_full_network() {
        let (catalogue, settings) = parse_network(NETWORK).unwrap();
        assert_eq!(settings.bus_wait_time, 5);
        assert_eq!(settings.bus_velocity, 60);
        assert_eq!(catalogue.vertex_count(), 3);
        assert_eq!(catalogue.buses().len(), 1);

        let a = catalogue.stop_id("A").unwrap();
        let b = catalogue.stop_id("B").unwrap();
        assert_eq!(catalogue.distance(a, b), 1000.0);
        // Non-ring route was expanded on registration.
        let bus = catalogue.bus(catalogue.bus_id("297").unwrap());
        assert_eq!(bus.stops.len(), 5);
    }

    #[test]
    fn test_forward_distance_reference_resolves() {
        // "A" declares a distance to "B" before "B" is declared: fine,
        // resolution runs after registration.
        let (catalogue, _) = parse_network(NETWORK).unwrap();
        let b = catalogue.stop_id("B").unwrap();
        let c = catalogue.stop_id("C").unwrap();
        assert_eq!(catalogue.distance(b, c), 1000.0);
    }

    #[test]
    fn test_unknown_stop_in_bus_is_an_error() {
        let json = r#"{
            "routing_settings": { "bus_wait_time": 5, "bus_velocity": 60 },
            "stops": [ { "name": "A", "lat": 0.0, "lon": 0.0 } ],
            "buses": [ { "name": "1", "stops": ["A", "Ghost"], "is_ring": false } ]
        }"#;
        match parse_network(json) {
            Err(ParseError::Lookup(LookupError::UnknownStop(name))) => {
                assert_eq!(name, "Ghost")
            }
            other => panic!("expected UnknownStop, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            parse_network("{ not json"),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_missing_settings_is_an_error() {
        assert!(matches!(
            parse_network(r#"{ "stops": [], "buses": [] }"#),
            Err(ParseError::Json(_))
        ));
    }
}
