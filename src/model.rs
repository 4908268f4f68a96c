//! Fleet data model: stops, vehicles, routes and savings summaries.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// A physical location to be visited, possibly the depot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    /// Location coordinates (lat, lng).
    pub coordinate: (f64, f64),
    #[serde(default)]
    pub is_depot: bool,
}

impl Stop {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            coordinate: (lat, lng),
            is_depot: false,
        }
    }

    pub fn depot(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            is_depot: true,
            ..Self::new(name, lat, lng)
        }
    }
}

/// A fleet member with its own location set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub locations: Vec<Stop>,
    /// Fill level percent by stop name. Stops absent here count as empty.
    #[serde(default)]
    pub fill_levels: HashMap<String, u32>,
    /// Opaque tag for renderers.
    #[serde(default)]
    pub display_color: String,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, locations: Vec<Stop>) -> Self {
        Self {
            id: id.into(),
            locations,
            fill_levels: HashMap::new(),
            display_color: String::new(),
        }
    }

    pub fn with_fill_level(mut self, stop: impl Into<String>, level: u32) -> Self {
        self.fill_levels.insert(stop.into(), level);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.display_color = color.into();
        self
    }

    pub fn fill_level(&self, stop: &str) -> Option<u32> {
        self.fill_levels.get(stop).copied()
    }

    /// Check the location set invariants: non-empty, unique names, valid
    /// coordinates, exactly one depot without a fill level, and fill levels
    /// only for known stops.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let vehicle = || self.id.clone();

        if self.locations.is_empty() {
            return Err(ConfigurationError::NoLocations { vehicle: vehicle() });
        }

        let mut names = HashSet::new();
        for stop in &self.locations {
            if !names.insert(stop.name.as_str()) {
                return Err(ConfigurationError::DuplicateStop {
                    vehicle: vehicle(),
                    stop: stop.name.clone(),
                });
            }

            let (lat, lng) = stop.coordinate;
            if !(lat.is_finite() && lng.is_finite() && lat.abs() <= 90.0 && lng.abs() <= 180.0) {
                return Err(ConfigurationError::InvalidCoordinate {
                    vehicle: vehicle(),
                    stop: stop.name.clone(),
                    lat,
                    lng,
                });
            }
        }

        let depots: Vec<&Stop> = self.locations.iter().filter(|stop| stop.is_depot).collect();
        match depots.as_slice() {
            [] => return Err(ConfigurationError::MissingDepot { vehicle: vehicle() }),
            [depot] => {
                if self.fill_levels.contains_key(&depot.name) {
                    return Err(ConfigurationError::DepotFillLevel {
                        vehicle: vehicle(),
                        stop: depot.name.clone(),
                    });
                }
            }
            many => {
                return Err(ConfigurationError::MultipleDepots {
                    vehicle: vehicle(),
                    count: many.len(),
                });
            }
        }

        // Sorted so the reported stop does not depend on hash order.
        let mut unknown: Vec<&String> = self
            .fill_levels
            .keys()
            .filter(|name| !names.contains(name.as_str()))
            .collect();
        unknown.sort();
        if let Some(stop) = unknown.first() {
            return Err(ConfigurationError::UnknownStop {
                vehicle: vehicle(),
                stop: (*stop).clone(),
            });
        }

        Ok(())
    }
}

/// Ordered visit sequence starting and ending at the depot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub stops: Vec<Stop>,
    /// Total travel distance in kilometers.
    pub distance_km: f64,
}

impl Route {
    /// Ordered coordinates for renderers.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.stops.iter().map(|stop| stop.coordinate).collect()
    }

    /// Names of the non-depot stops in visiting order.
    pub fn visit_names(&self) -> Vec<&str> {
        self.stops
            .iter()
            .filter(|stop| !stop.is_depot)
            .map(|stop| stop.name.as_str())
            .collect()
    }
}

/// Cost constants used to turn distances into savings estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRates {
    pub fuel_price_per_liter: f64,
    pub fuel_consumption_per_km: f64,
    pub labor_hours_saved_per_km: f64,
}

/// Derived savings estimates for one vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FleetSummary {
    pub initial_distance: f64,
    pub optimized_distance: f64,
    pub distance_saved: f64,
    pub fuel_cost_before: f64,
    pub fuel_cost_after: f64,
    pub fuel_savings: f64,
    pub labor_hours_saved: f64,
}

impl FleetSummary {
    pub fn from_distances(initial_distance: f64, optimized_distance: f64, rates: &CostRates) -> Self {
        let fuel_cost = |km: f64| km * rates.fuel_consumption_per_km * rates.fuel_price_per_liter;
        let distance_saved = initial_distance - optimized_distance;
        let fuel_cost_before = fuel_cost(initial_distance);
        let fuel_cost_after = fuel_cost(optimized_distance);

        Self {
            initial_distance,
            optimized_distance,
            distance_saved,
            fuel_cost_before,
            fuel_cost_after,
            fuel_savings: fuel_cost_before - fuel_cost_after,
            labor_hours_saved: distance_saved * rates.labor_hours_saved_per_km,
        }
    }

    /// Field-wise sum, used for fleet totals.
    pub fn combine(&self, other: &FleetSummary) -> FleetSummary {
        FleetSummary {
            initial_distance: self.initial_distance + other.initial_distance,
            optimized_distance: self.optimized_distance + other.optimized_distance,
            distance_saved: self.distance_saved + other.distance_saved,
            fuel_cost_before: self.fuel_cost_before + other.fuel_cost_before,
            fuel_cost_after: self.fuel_cost_after + other.fuel_cost_after,
            fuel_savings: self.fuel_savings + other.fuel_savings,
            labor_hours_saved: self.labor_hours_saved + other.labor_hours_saved,
        }
    }
}
