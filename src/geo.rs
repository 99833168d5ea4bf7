use geo::HaversineDistance;
use geo::Point;
use serde::Deserialize;

/// Geographic position of a stop, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Great-circle distance between two points in metres.
pub fn haversine_distance(from: Coordinates, to: Coordinates) -> f64 {
    let p1 = Point::new(from.lon, from.lat);
    let p2 = Point::new(to.lon, to.lat);
    p1.haversine_distance(&p2)
}
