//! Bin locations in Markham and Richmond Hill for realistic test fixtures.
//!
//! Two trucks, each with its own depot and a handful of public-space bins
//! with measured fill levels.

use bin_route_planner::model::{Stop, Vehicle};

/// A named location with coordinates and an optional fill level.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub fill_level: Option<u32>,
}

impl Location {
    pub const fn depot(name: &'static str, lat: f64, lng: f64) -> Self {
        Self {
            name,
            lat,
            lng,
            fill_level: None,
        }
    }

    pub const fn bin(name: &'static str, lat: f64, lng: f64, fill_level: u32) -> Self {
        Self {
            name,
            lat,
            lng,
            fill_level: Some(fill_level),
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

// ============================================================================
// Truck 1 (Markham)
// ============================================================================

pub const MARKHAM: &[Location] = &[
    Location::depot("Depot (Markham)", 43.8561, -79.3370),
    Location::bin("Markham Civic Centre", 43.8563, -79.3370, 45),
    Location::bin("Markville Mall", 43.8643, -79.3021, 70),
    Location::bin("Milne Dam Park", 43.8576, -79.2813, 55),
    Location::bin("Markham Village Library", 43.9025, -79.2590, 30),
    Location::bin("Unionville GO Station", 43.8565, -79.3164, 25),
    Location::bin("Angus Glen Community Centre", 43.9191, -79.3190, 60),
    Location::bin("Cornell Community Centre", 43.8952, -79.2443, 50),
];

// ============================================================================
// Truck 2 (Richmond Hill)
// ============================================================================

pub const RICHMOND_HILL: &[Location] = &[
    Location::depot("Depot (Richmond Hill)", 43.8811, -79.4370),
    Location::bin("Hillcrest Mall", 43.8783, -79.4402, 50),
    Location::bin("Richmond Green Sports Centre", 43.9021, -79.4121, 65),
    Location::bin("David Hamilton Park", 43.8876, -79.4213, 35),
    Location::bin("Richmond Hill Centre", 43.9165, -79.4355, 75),
    Location::bin("Elgin West Community Centre", 43.8819, -79.4525, 55),
    Location::bin("Langstaff Community Centre", 43.8565, -79.4700, 60),
];

/// Build a vehicle record from a location table.
pub fn vehicle(id: &str, color: &str, locations: &[Location]) -> Vehicle {
    let stops = locations
        .iter()
        .map(|location| {
            if location.fill_level.is_none() {
                Stop::depot(location.name, location.lat, location.lng)
            } else {
                Stop::new(location.name, location.lat, location.lng)
            }
        })
        .collect();

    locations
        .iter()
        .filter_map(|location| location.fill_level.map(|level| (location.name, level)))
        .fold(Vehicle::new(id, stops).with_color(color), |vehicle, (name, level)| {
            vehicle.with_fill_level(name, level)
        })
}

pub fn markham_truck() -> Vehicle {
    vehicle("Truck 1 (Markham)", "blue", MARKHAM)
}

pub fn richmond_hill_truck() -> Vehicle {
    vehicle("Truck 2 (Richmond Hill)", "red", RICHMOND_HILL)
}
