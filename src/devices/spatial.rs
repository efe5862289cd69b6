// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Geographic placement and nearest-edge-node assignment

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::GeoPoint;
use crate::edge::EdgeNode;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometres (haversine)
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Id of the edge node closest to `location`.
///
/// Ties go to the node encountered first. `None` only for an empty slice.
pub fn nearest_edge_node<'a>(location: &GeoPoint, edge_nodes: &'a [EdgeNode]) -> Option<&'a str> {
    let mut best: Option<(&EdgeNode, f64)> = None;
    for node in edge_nodes {
        let distance = haversine_km(location, &node.location);
        match best {
            Some((_, shortest)) if distance >= shortest => {}
            _ => best = Some((node, distance)),
        }
    }
    best.map(|(node, _)| node.id.as_str())
}

/// Rectangular simulation area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CityBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Default for CityBounds {
    fn default() -> Self {
        // Roughly 1 km square of midtown Manhattan
        Self {
            north: 40.7589,
            south: 40.7489,
            east: -73.9741,
            west: -73.9841,
        }
    }
}

impl CityBounds {
    /// Uniformly random point inside the bounds
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> GeoPoint {
        GeoPoint {
            lat: self.south + rng.gen::<f64>() * (self.north - self.south),
            lon: self.west + rng.gen::<f64>() * (self.east - self.west),
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn node(id: &str, lat: f64, lon: f64) -> EdgeNode {
        EdgeNode::new(id, id, GeoPoint::new(lat, lon), 1500.0)
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111.19 km
        let d = haversine_km(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.01);
        assert_eq!(haversine_km(&GeoPoint::new(40.75, -73.98), &GeoPoint::new(40.75, -73.98)), 0.0);
    }

    #[test]
    fn test_nearest_is_deterministic() {
        let nodes = vec![
            node("edge_node_1", 40.7559, -73.9781),
            node("edge_node_2", 40.7519, -73.9801),
            node("edge_node_3", 40.7579, -73.9761),
        ];
        let device = GeoPoint::new(40.7575, -73.9765);

        let first = nearest_edge_node(&device, &nodes);
        assert_eq!(first, Some("edge_node_3"));
        for _ in 0..10 {
            assert_eq!(nearest_edge_node(&device, &nodes), first);
        }
    }

    #[test]
    fn test_tie_goes_to_first() {
        let nodes = vec![node("a", 40.0, -74.0), node("b", 40.0, -74.0)];
        assert_eq!(nearest_edge_node(&GeoPoint::new(40.1, -74.0), &nodes), Some("a"));
        assert_eq!(nearest_edge_node(&GeoPoint::new(40.1, -74.0), &[]), None);
    }

    #[test]
    fn test_random_points_stay_inside() {
        let bounds = CityBounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..500 {
            assert!(bounds.contains(&bounds.random_point(&mut rng)));
        }
    }
}
